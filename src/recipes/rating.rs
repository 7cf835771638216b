// Copyright 2023 Remi Bernotavicius

use super::get_recipe;
use crate::database;
use crate::database::models::{Recipe, RecipeId, UserId};
use crate::{users, Error, Result};
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::ops::RangeInclusive;
use std::time::Duration;

pub const RATING_RANGE: RangeInclusive<i32> = 1..=5;

/// How many times a rating is attempted while other connections hold the write lock.
pub const RATING_RETRY_LIMIT: u32 = 3;

/// Wait before the first retry. It doubles with every further attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// How a recipe's aggregate rating moves when a user rates it.
#[derive(clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RatingFormula {
    /// `(aggregate + personal rating) / rating count`, the rule ratings have always been
    /// recorded with. It is not a mean once more than two users rate a recipe.
    #[default]
    Literal,
    /// The mean of every user's current personal rating.
    WeightedMean,
}

impl RatingFormula {
    /// Returns the new `(rating, rating_count)`. `previous` is the user's earlier personal rating,
    /// if they had one.
    pub fn apply(self, recipe: &Recipe, previous: Option<i32>, personal: i32) -> (f64, i32) {
        let count = match previous {
            None => recipe.rating_count + 1,
            Some(_) => recipe.rating_count.max(1),
        };
        let personal = f64::from(personal);
        let rating = match (self, previous) {
            (Self::Literal, _) => (recipe.rating + personal) / f64::from(count),
            (Self::WeightedMean, None) => {
                (recipe.rating * f64::from(recipe.rating_count) + personal) / f64::from(count)
            }
            (Self::WeightedMean, Some(previous)) => {
                (recipe.rating * f64::from(count) - f64::from(previous) + personal)
                    / f64::from(count)
            }
        };
        (rating, count)
    }
}

fn apply_rating(
    conn: &mut database::Connection,
    rated_recipe: RecipeId,
    rater: UserId,
    personal: i32,
    formula: RatingFormula,
) -> Result<Recipe> {
    use database::schema::{recipes, user_recipes};

    let recipe = get_recipe(conn, rated_recipe)?;
    users::get_user(conn, rater)?;

    let entry = users::ledger_entry(conn, rater, rated_recipe)?;
    let previous = entry
        .as_ref()
        .filter(|e| e.is_rated())
        .map(|e| e.rating);

    match &entry {
        Some(e) => {
            diesel::update(user_recipes::table.filter(user_recipes::id.eq(e.id)))
                .set(user_recipes::rating.eq(personal))
                .execute(conn)?;
        }
        None => {
            diesel::insert_into(user_recipes::table)
                .values((
                    user_recipes::user_id.eq(rater),
                    user_recipes::recipe_id.eq(rated_recipe),
                    user_recipes::rating.eq(personal),
                ))
                .execute(conn)?;
        }
    }

    let (rating, count) = formula.apply(&recipe, previous, personal);
    let recipe = diesel::update(recipes::table.filter(recipes::id.eq(rated_recipe)))
        .set((recipes::rating.eq(rating), recipes::rating_count.eq(count)))
        .returning(Recipe::as_returning())
        .get_result(conn)?;

    log::info!(
        "user {rater} rated recipe {rated_recipe} {personal} (was {previous:?}), now {rating:.2} from {count} rating(s)"
    );
    Ok(recipe)
}

/// Records `rater`'s personal rating of a recipe and updates the recipe's aggregate.
///
/// The read-modify-write runs in an immediate transaction, which takes SQLite's write lock up
/// front, so concurrent raters queue instead of overwriting each other. When the lock cannot be
/// had the attempt is repeated, with a growing pause, up to [`RATING_RETRY_LIMIT`] times before
/// giving up with `Conflict`.
pub fn record_rating(
    conn: &mut database::Connection,
    rated_recipe: RecipeId,
    rater: UserId,
    personal: i32,
    formula: RatingFormula,
) -> Result<Recipe> {
    if !RATING_RANGE.contains(&personal) {
        return Err(Error::validation(
            "rating",
            format!(
                "{personal} is outside {}..={}",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            ),
        ));
    }

    let mut attempt = 1;
    loop {
        let result = conn.immediate_transaction(|conn| {
            apply_rating(conn, rated_recipe, rater, personal, formula)
        });
        match result {
            Err(e) if e.is_lock_contention() && attempt < RATING_RETRY_LIMIT => {
                let delay = RETRY_BACKOFF * 2u32.pow(attempt - 1);
                log::warn!(
                    "rating recipe {rated_recipe} hit a locked database ({e}), retrying in {delay:?}"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) if e.is_lock_contention() => {
                return Err(Error::Conflict(format!(
                    "recipe {rated_recipe} is busy, gave up rating after {attempt} attempts"
                )));
            }
            result => return result,
        }
    }
}
