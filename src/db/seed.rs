use sqlx::SqlitePool;

use super::queries::categories::{count_categories, create_category};

pub struct SampleCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

pub const SAMPLE_CATEGORIES: &[SampleCategory] = &[
    SampleCategory {
        name: "Traffic Signs",
        description: "Warning, regulatory and information signs",
        color: "#EF4444",
    },
    SampleCategory {
        name: "Right of Way",
        description: "Intersections, roundabouts and priority rules",
        color: "#F59E0B",
    },
    SampleCategory {
        name: "Speed Limits",
        description: "Limits by road type and conditions",
        color: "#10B981",
    },
    SampleCategory {
        name: "Vehicle Safety",
        description: "Inspections, lights and safe loading",
        color: "#3B82F6",
    },
    SampleCategory {
        name: "First Aid",
        description: "What to do at the scene of an accident",
        color: "#8B5CF6",
    },
];

/// Inserts the sample categories into an empty database. Returns how many
/// were added.
pub async fn seed_sample_data(pool: &SqlitePool) -> sqlx::Result<usize> {
    if count_categories(pool).await? > 0 {
        return Ok(0);
    }
    for category in SAMPLE_CATEGORIES {
        create_category(pool, category.name, category.description, category.color, false).await?;
    }
    tracing::info!(count = SAMPLE_CATEGORIES.len(), "Seeded sample categories");
    Ok(SAMPLE_CATEGORIES.len())
}
