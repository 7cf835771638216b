// Copyright 2023 Remi Bernotavicius

//! Categories and tags: the shared labels recipes are filed under.
//!
//! Both are reference data. A label that is still used by a recipe cannot be deleted.

use crate::database;
use crate::database::models::{Category, CategoryId, Tag, TagId};
use crate::error::conflict_or;
use crate::{Error, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

pub(crate) fn check_label<'a>(field: &'static str, label: &'a str) -> Result<&'a str> {
    let label = label.trim();
    if label.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(label)
}

pub fn add_category(conn: &mut database::Connection, new_name: &str) -> Result<Category> {
    use database::schema::categories::dsl::*;
    use diesel::insert_into;

    let new_name = check_label("category name", new_name)?;
    let category = insert_into(categories)
        .values(name.eq(new_name))
        .returning(Category::as_returning())
        .get_result(conn)
        .map_err(conflict_or(|| format!("category {new_name:?} already exists")))?;
    log::info!("created category {:?}", category.name);
    Ok(category)
}

pub fn list_categories(conn: &mut database::Connection) -> Result<Vec<Category>> {
    use database::schema::categories::dsl::*;

    Ok(categories
        .select(Category::as_select())
        .order_by(name)
        .load(conn)?)
}

pub fn find_category(conn: &mut database::Connection, needle: &str) -> Result<Option<Category>> {
    use database::schema::categories::dsl::*;

    Ok(categories
        .select(Category::as_select())
        .filter(name.eq(needle))
        .first(conn)
        .optional()?)
}

pub fn count_categories(conn: &mut database::Connection) -> Result<i64> {
    use database::schema::categories::dsl::*;

    Ok(categories.count().get_result(conn)?)
}

pub fn rename_category(
    conn: &mut database::Connection,
    id_to_edit: CategoryId,
    new_name: &str,
) -> Result<Category> {
    use database::schema::categories::dsl::*;
    use diesel::update;

    let new_name = check_label("category name", new_name)?;
    update(categories.filter(id.eq(id_to_edit)))
        .set(name.eq(new_name))
        .returning(Category::as_returning())
        .get_result(conn)
        .optional()
        .map_err(conflict_or(|| format!("category {new_name:?} already exists")))?
        .ok_or_else(|| Error::not_found("category", id_to_edit))
}

/// Deletes an unused category. Fails with `Conflict` while any recipe is filed under it.
pub fn delete_category(conn: &mut database::Connection, delete_id: CategoryId) -> Result<()> {
    conn.transaction(|conn| {
        let count: i64 = {
            use database::schema::recipes::dsl::*;

            recipes
                .filter(category_id.eq(delete_id))
                .count()
                .get_result(conn)?
        };

        if count > 0 {
            return Err(Error::Conflict(format!(
                "category {delete_id} is used by {count} recipe(s)"
            )));
        }

        use database::schema::categories::dsl::*;
        use diesel::delete;

        let deleted = delete(categories.filter(id.eq(delete_id))).execute(conn)?;
        if deleted == 0 {
            return Err(Error::not_found("category", delete_id));
        }
        log::info!("deleted category {delete_id}");
        Ok(())
    })
}

pub fn add_tag(conn: &mut database::Connection, new_name: &str) -> Result<Tag> {
    use database::schema::tags::dsl::*;
    use diesel::insert_into;

    let new_name = check_label("tag name", new_name)?;
    let tag = insert_into(tags)
        .values(name.eq(new_name))
        .returning(Tag::as_returning())
        .get_result(conn)
        .map_err(conflict_or(|| format!("tag {new_name:?} already exists")))?;
    log::info!("created tag {:?}", tag.name);
    Ok(tag)
}

pub fn list_tags(conn: &mut database::Connection) -> Result<Vec<Tag>> {
    use database::schema::tags::dsl::*;

    Ok(tags.select(Tag::as_select()).order_by(name).load(conn)?)
}

pub fn find_tag(conn: &mut database::Connection, needle: &str) -> Result<Option<Tag>> {
    use database::schema::tags::dsl::*;

    Ok(tags
        .select(Tag::as_select())
        .filter(name.eq(needle))
        .first(conn)
        .optional()?)
}

pub fn count_tags(conn: &mut database::Connection) -> Result<i64> {
    use database::schema::tags::dsl::*;

    Ok(tags.count().get_result(conn)?)
}

pub fn rename_tag(conn: &mut database::Connection, id_to_edit: TagId, new_name: &str) -> Result<Tag> {
    use database::schema::tags::dsl::*;
    use diesel::update;

    let new_name = check_label("tag name", new_name)?;
    update(tags.filter(id.eq(id_to_edit)))
        .set(name.eq(new_name))
        .returning(Tag::as_returning())
        .get_result(conn)
        .optional()
        .map_err(conflict_or(|| format!("tag {new_name:?} already exists")))?
        .ok_or_else(|| Error::not_found("tag", id_to_edit))
}

/// Deletes an unused tag. Fails with `Conflict` while any recipe carries it.
pub fn delete_tag(conn: &mut database::Connection, delete_id: TagId) -> Result<()> {
    conn.transaction(|conn| {
        let count: i64 = {
            use database::schema::recipe_tags::dsl::*;

            recipe_tags
                .filter(tag_id.eq(delete_id))
                .count()
                .get_result(conn)?
        };

        if count > 0 {
            return Err(Error::Conflict(format!(
                "tag {delete_id} is used by {count} recipe(s)"
            )));
        }

        use database::schema::tags::dsl::*;
        use diesel::delete;

        let deleted = delete(tags.filter(id.eq(delete_id))).execute(conn)?;
        if deleted == 0 {
            return Err(Error::not_found("tag", delete_id));
        }
        log::info!("deleted tag {delete_id}");
        Ok(())
    })
}

#[test]
fn category_names_are_unique() {
    let mut conn = database::establish_in_memory().unwrap();

    add_category(&mut conn, "Main").unwrap();
    let err = add_category(&mut conn, "Main").unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err}");

    let err = add_category(&mut conn, "   ").unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "{err}");
}

#[test]
fn categories_are_listed_by_name() {
    let mut conn = database::establish_in_memory().unwrap();

    for n in ["Starter", "Desert", "Main"] {
        add_category(&mut conn, n).unwrap();
    }
    let names: Vec<_> = list_categories(&mut conn)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Desert", "Main", "Starter"]);
    assert_eq!(count_categories(&mut conn).unwrap(), 3);
}

#[test]
fn rename_category_and_tag() {
    let mut conn = database::establish_in_memory().unwrap();

    let desert = add_category(&mut conn, "Desert").unwrap();
    add_category(&mut conn, "Main").unwrap();
    let renamed = rename_category(&mut conn, desert.id, "Dessert").unwrap();
    assert_eq!(renamed.name, "Dessert");
    assert_eq!(find_category(&mut conn, "Dessert").unwrap(), Some(renamed));
    assert_eq!(find_category(&mut conn, "Desert").unwrap(), None);

    let err = rename_category(&mut conn, desert.id, "Main").unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err}");

    let err = rename_category(&mut conn, CategoryId(999), "Nothing").unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");

    let tag = add_tag(&mut conn, "Lactose free").unwrap();
    let renamed = rename_tag(&mut conn, tag.id, "Dairy free").unwrap();
    assert_eq!(renamed.name, "Dairy free");
    assert_eq!(list_tags(&mut conn).unwrap(), vec![renamed]);
}

#[test]
fn unused_labels_can_be_deleted() {
    let mut conn = database::establish_in_memory().unwrap();

    let lunch = add_category(&mut conn, "Lunch").unwrap();
    delete_category(&mut conn, lunch.id).unwrap();
    assert_eq!(count_categories(&mut conn).unwrap(), 0);

    let err = delete_category(&mut conn, lunch.id).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");

    let italian = add_tag(&mut conn, "Italian").unwrap();
    delete_tag(&mut conn, italian.id).unwrap();
    assert_eq!(count_tags(&mut conn).unwrap(), 0);
}
