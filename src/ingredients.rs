// Copyright 2023 Remi Bernotavicius

use crate::catalog::check_label;
use crate::database;
use crate::database::models::{Ingredient, IngredientId, UnitOfMeasure};
use crate::error::conflict_or;
use crate::{Error, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

pub fn add_ingredient(
    conn: &mut database::Connection,
    new_name: &str,
    new_unit: UnitOfMeasure,
) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;
    use diesel::insert_into;

    let new_name = check_label("ingredient name", new_name)?;
    let ingredient = insert_into(ingredients)
        .values((name.eq(new_name), unit.eq(new_unit)))
        .returning(Ingredient::as_returning())
        .get_result(conn)
        .map_err(conflict_or(|| format!("ingredient {new_name:?} already exists")))?;
    log::info!("created ingredient {:?} ({})", ingredient.name, ingredient.unit);
    Ok(ingredient)
}

pub fn get_ingredient(conn: &mut database::Connection, needle: IngredientId) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;

    ingredients
        .select(Ingredient::as_select())
        .filter(id.eq(needle))
        .first(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("ingredient", needle))
}

pub fn list_ingredients(conn: &mut database::Connection) -> Result<Vec<Ingredient>> {
    use database::schema::ingredients::dsl::*;

    Ok(ingredients
        .select(Ingredient::as_select())
        .order_by(name)
        .load(conn)?)
}

pub fn find_ingredient(
    conn: &mut database::Connection,
    needle: &str,
) -> Result<Option<Ingredient>> {
    use database::schema::ingredients::dsl::*;

    Ok(ingredients
        .select(Ingredient::as_select())
        .filter(name.eq(needle))
        .first(conn)
        .optional()?)
}

/// Ingredients whose name contains `query`, for pickers.
pub fn search_ingredients(
    conn: &mut database::Connection,
    query: &str,
) -> Result<Vec<Ingredient>> {
    use database::schema::ingredients::dsl::*;
    use diesel::expression_methods::EscapeExpressionMethods as _;
    use diesel::expression_methods::TextExpressionMethods as _;

    Ok(ingredients
        .select(Ingredient::as_select())
        .filter(name.like(crate::recipes::like_pattern(query)).escape('\\'))
        .order_by(name)
        .load(conn)?)
}

pub fn count_ingredients(conn: &mut database::Connection) -> Result<i64> {
    use database::schema::ingredients::dsl::*;

    Ok(ingredients.count().get_result(conn)?)
}

pub fn update_ingredient(
    conn: &mut database::Connection,
    edit_id: IngredientId,
    edit_name: &str,
    edit_unit: UnitOfMeasure,
) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;
    use diesel::update;

    let edit_name = check_label("ingredient name", edit_name)?;
    update(ingredients.filter(id.eq(edit_id)))
        .set((name.eq(edit_name), unit.eq(edit_unit)))
        .returning(Ingredient::as_returning())
        .get_result(conn)
        .optional()
        .map_err(conflict_or(|| format!("ingredient {edit_name:?} already exists")))?
        .ok_or_else(|| Error::not_found("ingredient", edit_id))
}

/// Deletes an ingredient no recipe uses. Fails with `Conflict` otherwise.
pub fn delete_ingredient(conn: &mut database::Connection, delete_id: IngredientId) -> Result<()> {
    conn.transaction(|conn| {
        let count: i64 = {
            use database::schema::recipe_ingredients::dsl::*;

            recipe_ingredients
                .filter(ingredient_id.eq(delete_id))
                .count()
                .get_result(conn)?
        };

        if count > 0 {
            return Err(Error::Conflict(format!(
                "ingredient {delete_id} is used by {count} recipe line(s)"
            )));
        }

        use database::schema::ingredients::dsl::*;
        use diesel::delete;

        let deleted = delete(ingredients.filter(id.eq(delete_id))).execute(conn)?;
        if deleted == 0 {
            return Err(Error::not_found("ingredient", delete_id));
        }
        log::info!("deleted ingredient {delete_id}");
        Ok(())
    })
}

#[test]
fn units_are_stored_by_abbreviation() {
    let mut conn = database::establish_in_memory().unwrap();

    for u in UnitOfMeasure::iter() {
        let i = add_ingredient(&mut conn, &format!("thing in {u}"), u).unwrap();
        assert_eq!(get_ingredient(&mut conn, i.id).unwrap().unit, u);
    }

    let stored: Vec<String> = {
        use database::schema::ingredients::dsl::*;
        use diesel::dsl::sql;
        use diesel::sql_types::Text;

        ingredients
            .select(sql::<Text>("unit"))
            .order_by(id)
            .load(&mut conn)
            .unwrap()
    };
    assert_eq!(stored, ["g", "kg", "ml", "l", "ts", "tbs", "pcs"]);
    assert_eq!("tbs".parse::<UnitOfMeasure>().unwrap(), UnitOfMeasure::Tablespoons);
}

#[test]
fn ingredient_names_are_unique() {
    let mut conn = database::establish_in_memory().unwrap();

    add_ingredient(&mut conn, "Rice", UnitOfMeasure::Grams).unwrap();
    let err = add_ingredient(&mut conn, "Rice", UnitOfMeasure::Kilograms).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err}");
    assert_eq!(count_ingredients(&mut conn).unwrap(), 1);
}

#[test]
fn update_and_search_ingredients() {
    let mut conn = database::establish_in_memory().unwrap();

    let paste = add_ingredient(&mut conn, "Curry paste", UnitOfMeasure::Teaspoons).unwrap();
    add_ingredient(&mut conn, "Coconut milk", UnitOfMeasure::Milliliters).unwrap();
    add_ingredient(&mut conn, "100% juice", UnitOfMeasure::Milliliters).unwrap();

    let paste = update_ingredient(&mut conn, paste.id, "Red curry paste", UnitOfMeasure::Tablespoons)
        .unwrap();
    assert_eq!(paste.unit, UnitOfMeasure::Tablespoons);
    assert_eq!(find_ingredient(&mut conn, "Red curry paste").unwrap(), Some(paste));

    let names: Vec<_> = search_ingredients(&mut conn, "CO")
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["Coconut milk"]);

    let names: Vec<_> = search_ingredients(&mut conn, "0%")
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, ["100% juice"]);

    let err = update_ingredient(&mut conn, IngredientId(404), "Nope", UnitOfMeasure::Grams)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");
}
