// Copyright 2023 Remi Bernotavicius

//! The recipe aggregate: a recipe with its ordered ingredient lines, its category and its tags.
//!
//! Every operation here runs in a single transaction, so readers never observe a recipe whose
//! lines or tags are half replaced.

use crate::config::Config;
use crate::database;
use crate::database::models::{
    Category, CategoryId, Ingredient, IngredientId, NewRecipeIngredientRow, NewRecipeRow, Recipe,
    RecipeChanges, RecipeHandle, RecipeId, RecipeIngredient, RecipeIngredientId, RecipeTag, Tag,
    TagId, UserId, DEFAULT_IMAGE,
};
use crate::{Error, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::BelongingToDsl as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::path::Path;

mod rating;
mod search;

pub use rating::{record_rating, RatingFormula, RATING_RANGE, RATING_RETRY_LIMIT};
pub use search::{search, RecipeFilter};

/// Prep and cook times are whole minutes, at most one week.
pub const MINUTES_RANGE: RangeInclusive<i32> = 1..=60 * 24 * 7;
pub const SERVINGS_RANGE: RangeInclusive<i32> = 1..=10_000;

/// Wraps `text` for a `LIKE ... ESCAPE '\'` substring match, matching `%` and `_` literally.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn check_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}

fn check_minutes(field: &'static str, value: i32) -> Result<()> {
    if !MINUTES_RANGE.contains(&value) {
        return Err(Error::validation(
            field,
            format!(
                "{value} is outside {}..={} minutes",
                MINUTES_RANGE.start(),
                MINUTES_RANGE.end()
            ),
        ));
    }
    Ok(())
}

pub(crate) fn check_servings(value: i32) -> Result<()> {
    if !SERVINGS_RANGE.contains(&value) {
        return Err(Error::validation(
            "servings",
            format!(
                "{value} is outside {}..={}",
                SERVINGS_RANGE.start(),
                SERVINGS_RANGE.end()
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngredientLine {
    pub ingredient_id: IngredientId,
    pub quantity: f32,
    /// A second quantity shown next to the first, e.g. for a scaled-down portion.
    pub alternate_quantity: Option<f32>,
}

impl IngredientLine {
    pub fn new(ingredient_id: IngredientId, quantity: f32) -> Self {
        Self {
            ingredient_id,
            quantity,
            alternate_quantity: None,
        }
    }

    pub fn with_alternate(mut self, alternate_quantity: f32) -> Self {
        self.alternate_quantity = Some(alternate_quantity);
        self
    }

    fn validate(&self) -> Result<()> {
        let positive = |q: f32| q.is_finite() && q > 0.0;
        if !positive(self.quantity) || !self.alternate_quantity.map_or(true, positive) {
            return Err(Error::validation(
                "quantity",
                format!("must be a positive number for ingredient {}", self.ingredient_id),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub author: String,
    pub intro: String,
    pub description: String,
    pub directions: String,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    /// Stored image file name. `None` selects the default picture.
    pub image: Option<String>,
    pub published: bool,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientLine>,
    /// The user creating the recipe gets an unrated ledger entry for it.
    pub created_by: Option<UserId>,
}

impl NewRecipe {
    fn validate(&self) -> Result<()> {
        check_text("name", &self.name)?;
        check_text("intro", &self.intro)?;
        check_text("description", &self.description)?;
        check_text("directions", &self.directions)?;
        check_minutes("prep_time", self.prep_time)?;
        check_minutes("cook_time", self.cook_time)?;
        check_servings(self.servings)?;
        for line in &self.ingredients {
            line.validate()?;
        }
        Ok(())
    }
}

/// A partial update. Column changes apply as given; tags and ingredients, when present, replace
/// the recipe's current ones wholesale.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecipeUpdate {
    pub changes: RecipeChanges,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientLine>>,
}

impl RecipeUpdate {
    fn validate(&self) -> Result<()> {
        let c = &self.changes;
        let texts = [
            ("name", &c.name),
            ("intro", &c.intro),
            ("description", &c.description),
            ("directions", &c.directions),
            ("image", &c.image),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                check_text(field, value)?;
            }
        }
        if let Some(v) = c.prep_time {
            check_minutes("prep_time", v)?;
        }
        if let Some(v) = c.cook_time {
            check_minutes("cook_time", v)?;
        }
        if let Some(v) = c.servings {
            check_servings(v)?;
        }
        for line in self.ingredients.iter().flatten() {
            line.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLine {
    pub id: RecipeIngredientId,
    pub ingredient: Ingredient,
    pub quantity: f32,
    pub alternate_quantity: Option<f32>,
}

impl RecipeLine {
    fn new((usage, ingredient): (RecipeIngredient, Ingredient)) -> Self {
        Self {
            id: usage.id,
            ingredient,
            quantity: usage.quantity,
            alternate_quantity: usage.alternate_quantity,
        }
    }
}

/// A recipe with everything it owns or references, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeAggregate {
    pub recipe: Recipe,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    /// In the order they were entered.
    pub ingredients: Vec<RecipeLine>,
}

impl RecipeAggregate {
    /// Directions split on blank lines.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.recipe
            .directions
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

fn check_references(
    conn: &mut database::Connection,
    category: Option<CategoryId>,
    tag_ids: Option<&[TagId]>,
    lines: Option<&[IngredientLine]>,
) -> Result<()> {
    use database::schema::{categories, ingredients, tags};

    if let Some(category) = category {
        let found: i64 = categories::table
            .filter(categories::id.eq(category))
            .count()
            .get_result(conn)?;
        if found == 0 {
            return Err(Error::not_found("category", category));
        }
    }

    if let Some(tag_ids) = tag_ids {
        let wanted: BTreeSet<_> = tag_ids.iter().copied().collect();
        let found: BTreeSet<TagId> = tags::table
            .select(tags::id)
            .filter(tags::id.eq_any(wanted.iter().copied().collect::<Vec<_>>()))
            .load::<TagId>(conn)?
            .into_iter()
            .collect();
        if let Some(missing) = wanted.difference(&found).next() {
            return Err(Error::not_found("tag", missing));
        }
    }

    if let Some(lines) = lines {
        let wanted: BTreeSet<_> = lines.iter().map(|l| l.ingredient_id).collect();
        let found: BTreeSet<IngredientId> = ingredients::table
            .select(ingredients::id)
            .filter(ingredients::id.eq_any(wanted.iter().copied().collect::<Vec<_>>()))
            .load::<IngredientId>(conn)?
            .into_iter()
            .collect();
        if let Some(missing) = wanted.difference(&found).next() {
            return Err(Error::not_found("ingredient", missing));
        }
    }

    Ok(())
}

fn replace_tags(conn: &mut database::Connection, owner: RecipeId, tag_ids: &[TagId]) -> Result<()> {
    use database::schema::recipe_tags::dsl::*;
    use diesel::{delete, insert_into};

    delete(recipe_tags.filter(recipe_id.eq(owner))).execute(conn)?;

    let unique: BTreeSet<_> = tag_ids.iter().copied().collect();
    let rows: Vec<_> = unique
        .into_iter()
        .map(|t| RecipeTag {
            recipe_id: owner,
            tag_id: t,
        })
        .collect();
    if !rows.is_empty() {
        insert_into(recipe_tags).values(&rows).execute(conn)?;
    }
    Ok(())
}

fn replace_ingredients(
    conn: &mut database::Connection,
    owner: RecipeId,
    lines: &[IngredientLine],
) -> Result<()> {
    use database::schema::recipe_ingredients::dsl::*;
    use diesel::{delete, insert_into};

    delete(recipe_ingredients.filter(recipe_id.eq(owner))).execute(conn)?;

    let rows: Vec<_> = lines
        .iter()
        .zip(0..)
        .map(|(line, p)| NewRecipeIngredientRow {
            recipe_id: owner,
            ingredient_id: line.ingredient_id,
            position: p,
            quantity: line.quantity,
            alternate_quantity: line.alternate_quantity,
        })
        .collect();
    if !rows.is_empty() {
        insert_into(recipe_ingredients).values(&rows).execute(conn)?;
    }
    Ok(())
}

pub fn create(conn: &mut database::Connection, new: &NewRecipe) -> Result<Recipe> {
    new.validate()?;

    conn.transaction(|conn| {
        check_references(
            conn,
            new.category_id,
            Some(&new.tags),
            Some(&new.ingredients),
        )?;
        if let Some(user) = new.created_by {
            crate::users::get_user(conn, user)?;
        }

        let image = new
            .image
            .as_deref()
            .filter(|i| !i.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE);
        let recipe = diesel::insert_into(database::schema::recipes::table)
            .values(NewRecipeRow {
                name: new.name.trim(),
                author: new.author.trim(),
                intro: &new.intro,
                description: &new.description,
                directions: &new.directions,
                prep_time: new.prep_time,
                cook_time: new.cook_time,
                servings: new.servings,
                image,
                published: new.published,
                category_id: new.category_id,
                rating: 0.0,
                rating_count: 0,
            })
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        replace_tags(conn, recipe.id, &new.tags)?;
        replace_ingredients(conn, recipe.id, &new.ingredients)?;

        if let Some(user) = new.created_by {
            use database::schema::user_recipes::dsl::*;

            diesel::insert_into(user_recipes)
                .values((user_id.eq(user), recipe_id.eq(recipe.id)))
                .execute(conn)?;
        }

        log::info!("created recipe {} {:?}", recipe.id, recipe.name);
        Ok(recipe)
    })
}

pub fn update(
    conn: &mut database::Connection,
    edit_id: RecipeId,
    update: &RecipeUpdate,
) -> Result<Recipe> {
    update.validate()?;

    conn.transaction(|conn| {
        get_recipe(conn, edit_id)?;
        check_references(
            conn,
            update.changes.category_id.flatten(),
            update.tags.as_deref(),
            update.ingredients.as_deref(),
        )?;

        if !update.changes.is_empty() {
            use database::schema::recipes::dsl::*;

            let mut changes = update.changes.clone();
            for label in [&mut changes.name, &mut changes.author].into_iter().flatten() {
                *label = label.trim().to_owned();
            }
            diesel::update(recipes.filter(id.eq(edit_id)))
                .set(&changes)
                .execute(conn)?;
        }
        if let Some(tag_ids) = &update.tags {
            replace_tags(conn, edit_id, tag_ids)?;
        }
        if let Some(lines) = &update.ingredients {
            replace_ingredients(conn, edit_id, lines)?;
        }

        let recipe = get_recipe(conn, edit_id)?;
        log::info!("changes to recipe {} {:?} have been saved", recipe.id, recipe.name);
        Ok(recipe)
    })
}

pub fn get_recipe(conn: &mut database::Connection, needle: RecipeId) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;

    recipes
        .select(Recipe::as_select())
        .filter(id.eq(needle))
        .first(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("recipe", needle))
}

pub fn get(conn: &mut database::Connection, needle: RecipeId) -> Result<RecipeAggregate> {
    use database::schema::{categories, ingredients, recipe_ingredients, recipe_tags, tags};

    conn.transaction(|conn| {
        let recipe = get_recipe(conn, needle)?;

        let category = match recipe.category_id {
            Some(category_id) => categories::table
                .select(Category::as_select())
                .filter(categories::id.eq(category_id))
                .first(conn)
                .optional()?,
            None => None,
        };

        let tags = recipe_tags::table
            .inner_join(tags::table)
            .filter(recipe_tags::recipe_id.eq(needle))
            .select(Tag::as_select())
            .order_by(tags::name)
            .load(conn)?;

        let ingredients = RecipeIngredient::belonging_to(&recipe)
            .inner_join(ingredients::table)
            .select((RecipeIngredient::as_select(), Ingredient::as_select()))
            .order_by(recipe_ingredients::position)
            .load(conn)?
            .into_iter()
            .map(RecipeLine::new)
            .collect();

        Ok(RecipeAggregate {
            recipe,
            category,
            tags,
            ingredients,
        })
    })
}

pub fn list_handles(conn: &mut database::Connection) -> Result<Vec<RecipeHandle>> {
    use database::schema::recipes::dsl::*;

    Ok(recipes
        .select(RecipeHandle::as_select())
        .order_by((name, id))
        .load(conn)?)
}

/// Up to `limit` recipes in random order, for a front page teaser.
pub fn random_selection(conn: &mut database::Connection, limit: i64) -> Result<Vec<Recipe>> {
    use database::schema::recipes::dsl::*;
    use diesel::dsl::sql;
    use diesel::sql_types::Integer;

    Ok(recipes
        .select(Recipe::as_select())
        .order_by(sql::<Integer>("RANDOM()"))
        .limit(limit)
        .load(conn)?)
}

pub fn count_recipes(conn: &mut database::Connection) -> Result<i64> {
    use database::schema::recipes::dsl::*;

    Ok(recipes.count().get_result(conn)?)
}

/// Deletes a recipe together with its lines, tag links and ledger entries. Refused while the
/// meal planner still references it.
pub fn delete(conn: &mut database::Connection, delete_id: RecipeId) -> Result<()> {
    conn.transaction(|conn| {
        let scheduled: i64 = {
            use database::schema::meals::dsl::*;

            meals
                .filter(recipe_id.eq(delete_id))
                .count()
                .get_result(conn)?
        };
        if scheduled > 0 {
            return Err(Error::Conflict(format!(
                "recipe {delete_id} is scheduled for {scheduled} meal(s)"
            )));
        }

        use database::schema::recipes::dsl::*;

        let deleted = diesel::delete(recipes.filter(id.eq(delete_id))).execute(conn)?;
        if deleted == 0 {
            return Err(Error::not_found("recipe", delete_id));
        }
        log::info!("deleted recipe {delete_id}");
        Ok(())
    })
}

/// Records the picture uploaded for a recipe. The file itself is stored by the caller under the
/// returned recipe's `image` name, which is `<recipe id>.<extension>`.
pub fn attach_image(
    conn: &mut database::Connection,
    config: &Config,
    edit_id: RecipeId,
    original_filename: &str,
) -> Result<Recipe> {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| config.is_allowed_image_extension(e))
        .ok_or_else(|| {
            Error::validation(
                "image",
                format!(
                    "{original_filename:?} is not one of {}",
                    config.image_extensions.join(", ")
                ),
            )
        })?;
    let stored = format!("{edit_id}.{}", extension.to_ascii_lowercase());

    use database::schema::recipes::dsl::*;

    let recipe = diesel::update(recipes.filter(id.eq(edit_id)))
        .set(image.eq(&stored))
        .returning(Recipe::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("recipe", edit_id))?;
    log::debug!("recipe {edit_id} now shows image {stored:?}");
    Ok(recipe)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog;
    use crate::database::models::UnitOfMeasure;
    use crate::ingredients;

    pub fn new_recipe(name: &str, category_id: Option<CategoryId>) -> NewRecipe {
        NewRecipe {
            name: name.into(),
            author: "SueChef".into(),
            intro: "A delicious but simple dish".into(),
            description: "a description.".into(),
            directions: "Start with bla bla and then\nDo some more steps\n\nEnjoy!".into(),
            prep_time: 15,
            cook_time: 30,
            servings: 4,
            image: None,
            published: true,
            category_id,
            tags: vec![],
            ingredients: vec![],
            created_by: None,
        }
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("fish"), "%fish%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn create_defaults() {
        let mut conn = database::establish_in_memory().unwrap();

        let recipe = create(&mut conn, &new_recipe("Fish curry", None)).unwrap();
        assert_eq!(recipe.rating_count, 0);
        assert_eq!(recipe.rating, 0.0);
        assert_eq!(recipe.average_rating(), None);
        assert_eq!(recipe.image, DEFAULT_IMAGE);
        assert_eq!(count_recipes(&mut conn).unwrap(), 1);
    }

    #[test]
    fn create_validates_before_writing() {
        let mut conn = database::establish_in_memory().unwrap();

        let cases: [(&str, fn(&mut NewRecipe)); 7] = [
            ("prep_time", |r| r.prep_time = 0),
            ("cook_time", |r| r.cook_time = 10_081),
            ("servings", |r| r.servings = 10_001),
            ("name", |r| r.name = " ".into()),
            ("intro", |r| r.intro = "".into()),
            ("directions", |r| r.directions = "\n".into()),
            ("quantity", |r| {
                r.ingredients = vec![IngredientLine::new(IngredientId(1), 0.0)]
            }),
        ];
        for (expected, break_it) in cases {
            let mut r = new_recipe("Broken", None);
            break_it(&mut r);
            match create(&mut conn, &r) {
                Err(Error::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error for {expected}, got {other:?}"),
            }
        }
        assert_eq!(count_recipes(&mut conn).unwrap(), 0);

        let mut r = new_recipe("Week long stew", None);
        r.prep_time = 10_080;
        r.cook_time = 1;
        r.servings = 10_000;
        create(&mut conn, &r).unwrap();
    }

    #[test]
    fn create_checks_references() {
        let mut conn = database::establish_in_memory().unwrap();

        let err = create(&mut conn, &new_recipe("Orphan", Some(CategoryId(7)))).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "category", .. }), "{err}");

        let mut r = new_recipe("Orphan", None);
        r.tags = vec![TagId(3)];
        let err = create(&mut conn, &r).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "tag", .. }), "{err}");

        let mut r = new_recipe("Orphan", None);
        r.ingredients = vec![IngredientLine::new(IngredientId(3), 1.0)];
        let err = create(&mut conn, &r).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "ingredient", .. }), "{err}");

        assert_eq!(count_recipes(&mut conn).unwrap(), 0);
    }

    #[test]
    fn aggregate_keeps_ingredient_order() {
        let mut conn = database::establish_in_memory().unwrap();

        let main = catalog::add_category(&mut conn, "Main").unwrap();
        let indian = catalog::add_tag(&mut conn, "Indian").unwrap();
        let lactose = catalog::add_tag(&mut conn, "Lactose free").unwrap();
        let rice = ingredients::add_ingredient(&mut conn, "Rice", UnitOfMeasure::Grams).unwrap();
        let paste =
            ingredients::add_ingredient(&mut conn, "Curry paste", UnitOfMeasure::Teaspoons)
                .unwrap();
        let fish =
            ingredients::add_ingredient(&mut conn, "White fish", UnitOfMeasure::Grams).unwrap();

        let mut r = new_recipe("Fish curry", Some(main.id));
        r.tags = vec![lactose.id, indian.id, indian.id];
        r.ingredients = vec![
            IngredientLine::new(rice.id, 320.0),
            IngredientLine::new(paste.id, 3.0).with_alternate(0.75),
            IngredientLine::new(fish.id, 400.0),
        ];
        let recipe = create(&mut conn, &r).unwrap();

        let aggregate = get(&mut conn, recipe.id).unwrap();
        assert_eq!(aggregate.category, Some(main.clone()));
        assert_eq!(aggregate.tags, vec![indian.clone(), lactose]);
        let lines: Vec<_> = aggregate
            .ingredients
            .iter()
            .map(|l| (l.ingredient.name.as_str(), l.quantity, l.alternate_quantity))
            .collect();
        assert_eq!(
            lines,
            [
                ("Rice", 320.0, None),
                ("Curry paste", 3.0, Some(0.75)),
                ("White fish", 400.0, None)
            ]
        );
        let paragraphs: Vec<_> = aggregate.paragraphs().collect();
        assert_eq!(
            paragraphs,
            ["Start with bla bla and then\nDo some more steps", "Enjoy!"]
        );

        let err = ingredients::delete_ingredient(&mut conn, rice.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{err}");
        let err = catalog::delete_tag(&mut conn, indian.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{err}");
        let err = catalog::delete_category(&mut conn, main.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{err}");
    }

    #[test]
    fn partial_update() {
        let mut conn = database::establish_in_memory().unwrap();

        let main = catalog::add_category(&mut conn, "Main").unwrap();
        let side = catalog::add_category(&mut conn, "Side dish").unwrap();
        let moroccan = catalog::add_tag(&mut conn, "Moroccan").unwrap();
        let eggplant =
            ingredients::add_ingredient(&mut conn, "Eggplant", UnitOfMeasure::Pieces).unwrap();
        let tomato =
            ingredients::add_ingredient(&mut conn, "Tomato", UnitOfMeasure::Pieces).unwrap();

        let mut r = new_recipe("Zalouk", Some(main.id));
        r.ingredients = vec![IngredientLine::new(tomato.id, 2.0)];
        let recipe = create(&mut conn, &r).unwrap();

        let updated = update(
            &mut conn,
            recipe.id,
            &RecipeUpdate {
                changes: RecipeChanges {
                    name: Some("Zaalouk".into()),
                    category_id: Some(Some(side.id)),
                    ..Default::default()
                },
                tags: Some(vec![moroccan.id]),
                ingredients: Some(vec![
                    IngredientLine::new(eggplant.id, 2.0),
                    IngredientLine::new(tomato.id, 3.0),
                ]),
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Zaalouk");
        assert_eq!(updated.category_id, Some(side.id));
        assert_eq!(updated.intro, recipe.intro);
        assert_eq!(updated.servings, recipe.servings);

        let aggregate = get(&mut conn, recipe.id).unwrap();
        assert_eq!(aggregate.tags, vec![moroccan]);
        let names: Vec<_> = aggregate
            .ingredients
            .iter()
            .map(|l| l.ingredient.name.as_str())
            .collect();
        assert_eq!(names, ["Eggplant", "Tomato"]);

        let cleared = update(
            &mut conn,
            recipe.id,
            &RecipeUpdate {
                changes: RecipeChanges {
                    category_id: Some(None),
                    ..Default::default()
                },
                tags: Some(vec![]),
                ingredients: None,
            },
        )
        .unwrap();
        assert_eq!(cleared.category_id, None);
        let aggregate = get(&mut conn, recipe.id).unwrap();
        assert!(aggregate.tags.is_empty());
        assert_eq!(aggregate.ingredients.len(), 2);

        let err = update(
            &mut conn,
            recipe.id,
            &RecipeUpdate {
                changes: RecipeChanges {
                    servings: Some(0),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "servings", .. }), "{err}");

        let renamed = update(
            &mut conn,
            recipe.id,
            &RecipeUpdate {
                changes: RecipeChanges {
                    name: Some("  Zaalouk bowl ".into()),
                    author: Some(" Sue ".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(renamed.name, "Zaalouk bowl");
        assert_eq!(renamed.author, "Sue");

        let err = update(&mut conn, RecipeId(99), &RecipeUpdate::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "recipe", .. }), "{err}");
    }

    #[test]
    fn images_are_named_after_the_recipe() {
        let mut conn = database::establish_in_memory().unwrap();
        let config = Config::default();

        let recipe = create(&mut conn, &new_recipe("Weekend tajine", None)).unwrap();
        let recipe = attach_image(&mut conn, &config, recipe.id, "My Tajine.JPG").unwrap();
        assert_eq!(recipe.image, format!("{}.jpg", recipe.id));

        let err = attach_image(&mut conn, &config, recipe.id, "tajine.exe").unwrap_err();
        assert!(matches!(err, Error::Validation { field: "image", .. }), "{err}");
        let err = attach_image(&mut conn, &config, recipe.id, "no_extension").unwrap_err();
        assert!(matches!(err, Error::Validation { field: "image", .. }), "{err}");
        let err = attach_image(&mut conn, &config, RecipeId(42), "a.png").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");
    }

    #[test]
    fn delete_cascades_to_owned_rows() {
        let mut conn = database::establish_in_memory().unwrap();

        let rice = ingredients::add_ingredient(&mut conn, "Rice", UnitOfMeasure::Grams).unwrap();
        let vegetarian = catalog::add_tag(&mut conn, "Vegetarian").unwrap();
        let mut r = new_recipe("Rice bowl", None);
        r.tags = vec![vegetarian.id];
        r.ingredients = vec![IngredientLine::new(rice.id, 100.0)];
        let recipe = create(&mut conn, &r).unwrap();

        delete(&mut conn, recipe.id).unwrap();
        assert_eq!(count_recipes(&mut conn).unwrap(), 0);

        // Nothing references the reference rows any more.
        ingredients::delete_ingredient(&mut conn, rice.id).unwrap();
        catalog::delete_tag(&mut conn, vegetarian.id).unwrap();

        let err = delete(&mut conn, recipe.id).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");
    }

    #[test]
    fn random_selection_is_bounded() {
        let mut conn = database::establish_in_memory().unwrap();

        for n in ["A", "B", "C", "D", "E", "F"] {
            create(&mut conn, &new_recipe(n, None)).unwrap();
        }
        assert_eq!(random_selection(&mut conn, 4).unwrap().len(), 4);
        assert_eq!(list_handles(&mut conn).unwrap().len(), 6);
    }
}
