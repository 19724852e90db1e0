//! Metadata enrichment
//!
//! There is no real catalogue behind this: after a simulated lookup the
//! handler generates plausible ratings, tags and a fun fact for the game.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use super::Latency;
use crate::error::Result;
use crate::models::{EnrichedMetadata, MetadataJob};

/// Tags a game can be labelled with
pub const TAGS: [&str; 20] = [
    "Retro",
    "Classic",
    "Pixel Art",
    "Challenging",
    "Story-Rich",
    "Action",
    "Adventure",
    "RPG",
    "Platformer",
    "Puzzle",
    "Multiplayer",
    "Single-player",
    "Arcade",
    "Strategy",
    "Shooter",
    "Racing",
    "Fighting",
    "Roguelike",
    "Metroidvania",
    "Open World",
];

const DIFFICULTY_LEVELS: [&str; 3] = ["Easy", "Medium", "Hard"];

const UNKNOWN_DEVELOPER: &str = "An unknown studio";

/// Enrich a game after a simulated lookup
pub async fn enrich(job: &MetadataJob, latency: &Latency) -> Result<EnrichedMetadata> {
    info!(game_id = %job.game_id, title = %job.title, "Enriching metadata");

    latency.pause_between(1.0, 3.0).await;
    let metadata = generate(job, &mut rand::thread_rng());

    info!(
        game_id = %job.game_id,
        rating = metadata.average_rating,
        tags = ?metadata.tags,
        "Generated enriched metadata"
    );
    Ok(metadata)
}

/// Generate metadata for `job` from `rng`
pub fn generate<R: Rng + ?Sized>(job: &MetadataJob, rng: &mut R) -> EnrichedMetadata {
    let rating: f64 = rng.gen_range(3.0..=5.0);
    let tag_count = rng.gen_range(3..=5);
    let difficulty = DIFFICULTY_LEVELS.choose(rng).copied().unwrap_or("Medium");

    EnrichedMetadata {
        average_rating: (rating * 10.0).round() / 10.0,
        total_reviews: rng.gen_range(10..=1000),
        difficulty_level: difficulty.to_string(),
        estimated_play_time: format!("{} hours", rng.gen_range(1..=100)),
        tags: TAGS
            .choose_multiple(rng, tag_count)
            .map(|tag| tag.to_string())
            .collect(),
        fun_fact: fun_fact(
            rng.gen_range(0..10),
            &job.title,
            job.developer.as_deref().unwrap_or(UNKNOWN_DEVELOPER),
        ),
    }
}

fn fun_fact(index: usize, title: &str, developer: &str) -> String {
    match index {
        0 => format!("Did you know that {} was developed in just 6 months?", title),
        1 => format!(
            "The main character in {} was inspired by the developer's pet.",
            title
        ),
        2 => format!("{} originally had a different name during development.", title),
        3 => format!(
            "A hidden level in {} can only be accessed through a specific sequence of button presses.",
            title
        ),
        4 => format!("{} created {} with a team of just 5 people.", developer, title),
        5 => format!("The music for {} was composed in just two weeks.", title),
        6 => format!(
            "An early version of {} featured completely different gameplay.",
            title
        ),
        7 => format!(
            "The final boss in {} was added just one week before release.",
            title
        ),
        8 => format!(
            "{} contains a hidden message in its code that wasn't discovered until years after release.",
            title
        ),
        _ => format!(
            "The iconic sound effects in {} were created using household items.",
            title
        ),
    }
}
