//! Seeds catalogue categories listed in config.toml.
//!
//! Runs on every startup. Existing slugs are left untouched so admin edits made
//! through the API survive restarts.

use crate::{
    config::app::CategorySeed,
    core::category,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::{debug, info, instrument};

/// Creates every configured category whose slug is not taken yet.
/// Returns how many were created.
#[instrument(skip(db, seeds))]
pub async fn seed_categories(db: &DatabaseConnection, seeds: &[CategorySeed]) -> Result<usize> {
    info!("Seeding categories. Found {} configurations from TOML.", seeds.len());
    let mut created = 0;

    for seed in seeds {
        let slug = match &seed.slug {
            Some(slug) => category::slugify(slug)?,
            None => category::slugify(&seed.name)?,
        };
        if category::get_category_by_slug(db, &slug).await?.is_some() {
            debug!("Category '{}' already exists. Skipping.", slug);
            continue;
        }
        category::create_category(db, &seed.name, Some(&slug), seed.description.clone()).await?;
        created += 1;
    }

    info!("Finished seeding categories, {} created.", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    fn seed(name: &str, slug: Option<&str>) -> CategorySeed {
        CategorySeed {
            name: name.to_string(),
            slug: slug.map(ToString::to_string),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_seed_categories_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![seed("Web Development", None), seed("Data", Some("Data Science"))];

        assert_eq!(seed_categories(&db, &seeds).await?, 2);
        assert_eq!(seed_categories(&db, &seeds).await?, 0);

        let all = category::list_categories(&db).await?;
        assert_eq!(all.len(), 2);
        assert!(category::get_category_by_slug(&db, "web-development").await?.is_some());
        assert!(category::get_category_by_slug(&db, "data-science").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_keeps_admin_edits() -> Result<()> {
        let db = setup_test_db().await?;
        let seeds = vec![seed("Design", None)];
        seed_categories(&db, &seeds).await?;

        let existing = category::get_category_by_slug(&db, "design").await?.unwrap();
        category::update_category(
            &db,
            existing.id,
            category::CategoryUpdate {
                name: Some("Visual Design".to_string()),
                ..Default::default()
            },
        )
        .await?;
        seed_categories(&db, &seeds).await?;

        let kept = category::get_category_by_slug(&db, "design").await?.unwrap();
        assert_eq!(kept.name, "Visual Design");
        Ok(())
    }
}
