//! Category business logic - Catalogue groupings managed from the admin forms.
//!
//! Slugs are unique. A category cannot be removed while courses still point at
//! it, so the catalogue never shows orphaned listings.

use crate::{
    entities::{Category, Course, category, course},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};

/// Turns arbitrary text into a URL-safe slug.
///
/// ASCII letters and digits are lowercased and kept; every run of other
/// characters becomes a single `-`. Leading and trailing dashes are dropped.
pub fn slugify(text: &str) -> Result<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return Err(Error::validation("slug", "must contain letters or digits"));
    }
    Ok(slug)
}

/// Fields an admin may change on a category
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    /// New display name
    pub name: Option<String>,
    /// New slug (normalised through `slugify`)
    pub slug: Option<String>,
    /// New description; an empty string clears it
    pub description: Option<String>,
}

async fn ensure_slug_free(db: &DatabaseConnection, slug: &str, except: Option<i64>) -> Result<()> {
    if let Some(existing) = get_category_by_slug(db, slug).await? {
        if Some(existing.id) != except {
            return Err(Error::conflict(format!("category slug '{slug}' is already taken")));
        }
    }
    Ok(())
}

/// Creates a category. The slug defaults to the slugified name.
pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
    slug: Option<&str>,
    description: Option<String>,
) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }
    let slug = slugify(slug.unwrap_or(name))?;
    ensure_slug_free(db, &slug, None).await?;

    let category = category::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug),
        description: Set(description.filter(|d| !d.trim().is_empty())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(category.insert(db).await?)
}

/// Lists every category alphabetically.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by primary key.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by slug.
pub async fn get_category_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update, re-checking slug uniqueness when it changes.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    update: CategoryUpdate,
) -> Result<category::Model> {
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?;
    let mut active: category::ActiveModel = existing.into();

    if let Some(name) = update.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name", "cannot be empty"));
        }
        active.name = Set(name.to_string());
    }
    if let Some(slug) = update.slug {
        let slug = slugify(&slug)?;
        ensure_slug_free(db, &slug, Some(category_id)).await?;
        active.slug = Set(slug);
    }
    if let Some(description) = update.description {
        active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
    }

    Ok(active.update(db).await?)
}

/// Deletes a category that no course references.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?;

    let course_count = Course::find()
        .filter(course::Column::CategoryId.eq(category_id))
        .count(db)
        .await?;
    if course_count > 0 {
        return Err(Error::conflict(format!(
            "category '{}' still has {course_count} course(s)",
            existing.slug
        )));
    }

    existing.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Web Development").unwrap(), "web-development");
        assert_eq!(slugify("  C++ & Rust!! ").unwrap(), "c-rust");
        assert_eq!(slugify("--already-a-slug--").unwrap(), "already-a-slug");
        assert_eq!(slugify("Ünïcode Tîtle 2").unwrap(), "n-code-t-tle-2");
        assert!(matches!(slugify("!!!"), Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_category_defaults_slug() -> Result<()> {
        let db = setup_test_db().await?;

        let category = create_category(&db, "Data Science", None, None).await?;
        assert_eq!(category.slug, "data-science");
        assert!(category.description.is_none());

        let found = get_category_by_slug(&db, "data-science").await?;
        assert_eq!(found.unwrap().id, category.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_category(&db, "Design", None, None).await?;

        let result = create_category(&db, "Design!", None, None).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let result = create_category(&db, "Visual", Some("design"), None).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_category() -> Result<()> {
        let db = setup_test_db().await?;
        let design = create_category(&db, "Design", None, Some("Old".to_string())).await?;
        create_category(&db, "Business", None, None).await?;

        let updated = update_category(
            &db,
            design.id,
            CategoryUpdate {
                name: Some("Product Design".to_string()),
                slug: Some("Product Design".to_string()),
                description: Some(String::new()),
            },
        )
        .await?;
        assert_eq!(updated.name, "Product Design");
        assert_eq!(updated.slug, "product-design");
        assert!(updated.description.is_none());

        // Keeping its own slug is not a conflict
        let same = update_category(
            &db,
            design.id,
            CategoryUpdate {
                slug: Some("product-design".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(same.slug, "product-design");

        let taken = update_category(
            &db,
            design.id,
            CategoryUpdate {
                slug: Some("business".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(taken, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_categories_alphabetical() -> Result<()> {
        let db = setup_test_db().await?;
        create_category(&db, "Zoology", None, None).await?;
        create_category(&db, "Art", None, None).await?;

        let names: Vec<String> = list_categories(&db)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Art", "Zoology"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_category_with_courses_is_rejected() -> Result<()> {
        let (db, _instructor, course) = setup_with_course().await?;
        let category_id = course.category_id.unwrap();

        let result = delete_category(&db, category_id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let empty = create_category(&db, "Empty", None, None).await?;
        delete_category(&db, empty.id).await?;
        assert!(get_category_by_id(&db, empty.id).await?.is_none());

        let missing = delete_category(&db, 999).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }
}
