use std::path::PathBuf;

use anyhow::Context as _;
use popstat_metrics::{SessionCollection, SessionRecord};
use rand::{Rng, SeedableRng as _};
use rand_distr::Normal;
use rand_pcg::Pcg32;
use tracing::info;

use crate::util::Output;

const DAY_MILLIS: i64 = 86_400_000;
const HISTORY_DAYS: i64 = 60;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct GenerateSessionsArg {
    /// Number of players
    #[arg(long, default_value_t = 10)]
    players: usize,
    /// Sessions generated for each player
    #[arg(long, default_value_t = 20)]
    sessions_per_player: usize,
    /// Number of distinct stages; 0 leaves stage ids unset
    #[arg(long, default_value_t = 5)]
    stages: u32,
    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateSessionsArg) -> anyhow::Result<()> {
    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    let now = chrono::Utc::now().timestamp_millis();
    let collection = generate(arg, seed, now)?;
    info!(
        seed,
        players = arg.players,
        sessions = collection.sessions.len(),
        "generated sessions"
    );
    Output::save_json(&collection, arg.output.as_deref())?;
    Ok(())
}

fn generate(arg: &GenerateSessionsArg, seed: u64, now: i64) -> anyhow::Result<SessionCollection> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let skill_dist = Normal::new(0.72, 0.12).context("Invalid skill distribution")?;
    let noise_dist = Normal::new(0.0, 0.05).context("Invalid accuracy noise distribution")?;

    let mut sessions = Vec::with_capacity(arg.players * arg.sessions_per_player);
    for player in 0..arg.players {
        let player_id = format!("player_{player}");
        let skill = rng.sample::<f64, _>(skill_dist).clamp(0.3, 0.98);
        for n in 0..arg.sessions_per_player {
            let accuracy: f64 = (skill + rng.sample(noise_dist)).clamp(0.0, 1.0);
            let start_time = now - rng.random_range(0..HISTORY_DAYS * DAY_MILLIS);
            let duration = rng.random_range(60_000..600_000);
            let attempts: u64 = rng.random_range(50..300);
            #[expect(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let bubbles_popped = (attempts as f64 * accuracy).round() as u64;
            let max_combo = rng.random_range(0..=bubbles_popped / 4);
            let stage_id =
                (arg.stages > 0).then(|| format!("stage_{}", rng.random_range(1..=arg.stages)));
            sessions.push(SessionRecord {
                session_id: format!("{player_id}-{n}"),
                player_id: Some(player_id.clone()),
                stage_id,
                start_time,
                end_time: start_time + duration,
                final_score: bubbles_popped * rng.random_range(8..=12) + max_combo * 5,
                bubbles_popped,
                bubbles_missed: attempts - bubbles_popped,
                max_combo,
                completed: rng.random_bool(skill),
            });
        }
    }
    sessions.sort_by_key(|s| s.start_time);
    Ok(SessionCollection { sessions })
}

#[cfg(test)]
mod tests {
    use popstat_metrics::MetricsCalculator;

    use super::*;

    fn arg(players: usize, sessions_per_player: usize, stages: u32) -> GenerateSessionsArg {
        GenerateSessionsArg {
            players,
            sessions_per_player,
            stages,
            ..GenerateSessionsArg::default()
        }
    }

    #[test]
    fn test_same_seed_same_sessions() {
        let arg = arg(3, 4, 2);
        let a = generate(&arg, 42, 1_700_000_000_000).unwrap();
        let b = generate(&arg, 42, 1_700_000_000_000).unwrap();
        assert_eq!(a.sessions, b.sessions);
        assert_eq!(a.sessions.len(), 12);
    }

    #[test]
    fn test_sessions_are_valid() {
        let now = 1_700_000_000_000;
        let collection = generate(&arg(4, 5, 3), 7, now).unwrap();
        for s in &collection.sessions {
            MetricsCalculator::calculate(s).unwrap();
            assert!(s.start_time <= now && s.start_time > now - HISTORY_DAYS * DAY_MILLIS);
            assert!(s.stage_id.is_some());
        }
        assert!(
            collection
                .sessions
                .windows(2)
                .all(|w| w[0].start_time <= w[1].start_time)
        );
    }

    #[test]
    fn test_zero_stages() {
        let collection = generate(&arg(1, 3, 0), 1, 0).unwrap();
        assert!(collection.sessions.iter().all(|s| s.stage_id.is_none()));
    }
}
