// Copyright 2023 Remi Bernotavicius

//! The meal calendar. Each entry either serves a recipe or names a meal cooked without one.

use crate::database;
use crate::database::models::{MealId, MealRow, NewMealRow, RecipeHandle, RecipeId};
use crate::recipes::{self, check_servings};
use crate::{Error, Result};
use diesel::expression_methods::NullableExpressionMethods as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealKind {
    Recipe {
        recipe: RecipeHandle,
        /// Overrides the recipe's own servings.
        servings: Option<i32>,
    },
    AdHoc {
        name: String,
        note: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meal {
    pub id: MealId,
    pub day: chrono::NaiveDate,
    pub kind: MealKind,
}

impl Meal {
    pub fn title(&self) -> &str {
        match &self.kind {
            MealKind::Recipe { recipe, .. } => &recipe.name,
            MealKind::AdHoc { name, .. } => name,
        }
    }

    fn from_row(row: MealRow, recipe_name: Option<String>) -> Result<Self> {
        let kind = match (row.recipe_id, recipe_name) {
            (Some(id), Some(name)) => MealKind::Recipe {
                recipe: RecipeHandle { id, name },
                servings: row.servings,
            },
            (Some(id), None) => return Err(Error::not_found("recipe", id)),
            (None, _) => MealKind::AdHoc {
                name: row.name.unwrap_or_default(),
                note: row.note,
            },
        };
        Ok(Self {
            id: row.id,
            day: row.day,
            kind,
        })
    }
}

/// A request to put something on the calendar. Exactly one of `recipe` and `name` must be given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMeal {
    pub day: chrono::NaiveDate,
    pub recipe: Option<RecipeId>,
    pub name: Option<String>,
    /// Only for meals without a recipe.
    pub note: Option<String>,
    /// Only for recipe meals.
    pub servings: Option<i32>,
}

impl NewMeal {
    pub fn recipe(day: chrono::NaiveDate, recipe: RecipeId) -> Self {
        Self {
            day,
            recipe: Some(recipe),
            ..Self::default()
        }
    }

    pub fn named(day: chrono::NaiveDate, name: impl Into<String>) -> Self {
        Self {
            day,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<NewMealRow<'_>> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let note = self.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        match (self.recipe, name) {
            (None, None) => Err(Error::validation(
                "meal",
                "needs either a recipe or a name",
            )),
            (Some(_), Some(_)) => Err(Error::validation(
                "meal",
                "takes a recipe or a name, not both",
            )),
            (Some(_), None) if note.is_some() => Err(Error::validation(
                "note",
                "only meals without a recipe carry a note",
            )),
            (None, Some(_)) if self.servings.is_some() => Err(Error::validation(
                "servings",
                "only recipe meals carry servings",
            )),
            (recipe_id, name) => {
                if let Some(servings) = self.servings {
                    check_servings(servings)?;
                }
                Ok(NewMealRow {
                    day: self.day,
                    recipe_id,
                    name,
                    note,
                    servings: self.servings,
                })
            }
        }
    }
}

pub fn schedule_meal(conn: &mut database::Connection, new: &NewMeal) -> Result<Meal> {
    let row = new.validate()?;

    conn.transaction(|conn| {
        let recipe_name = match row.recipe_id {
            Some(recipe) => Some(recipes::get_recipe(conn, recipe)?.name),
            None => None,
        };

        let stored = diesel::insert_into(database::schema::meals::table)
            .values(&row)
            .returning(MealRow::as_returning())
            .get_result(conn)?;
        let meal = Meal::from_row(stored, recipe_name)?;
        log::info!("scheduled {:?} on {}", meal.title(), meal.day);
        Ok(meal)
    })
}

pub fn unschedule(conn: &mut database::Connection, meal: MealId) -> Result<()> {
    use database::schema::meals::dsl::*;

    let deleted = diesel::delete(meals.filter(id.eq(meal))).execute(conn)?;
    if deleted == 0 {
        return Err(Error::not_found("meal", meal));
    }
    log::info!("removed meal {meal} from the calendar");
    Ok(())
}

/// Meals ordered by day, and by the order they were scheduled within a day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MealCalendar {
    meals: Vec<Meal>,
}

impl MealCalendar {
    /// Each day that has meals, with its meals. Can be called any number of times.
    pub fn days(&self) -> impl Iterator<Item = (chrono::NaiveDate, &[Meal])> + '_ {
        self.meals
            .chunk_by(|a, b| a.day == b.day)
            .map(|day| (day[0].day, day))
    }

    pub fn meals(&self) -> &[Meal] {
        &self.meals
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }

    pub fn into_meals(self) -> Vec<Meal> {
        self.meals
    }
}

fn load_calendar(
    conn: &mut database::Connection,
    first: chrono::NaiveDate,
    last: Option<chrono::NaiveDate>,
) -> Result<MealCalendar> {
    use database::schema::{meals, recipes};

    let mut query = meals::table
        .left_join(recipes::table)
        .select((MealRow::as_select(), recipes::name.nullable()))
        .filter(meals::day.ge(first))
        .into_boxed();
    if let Some(last) = last {
        query = query.filter(meals::day.le(last));
    }

    let rows: Vec<(MealRow, Option<String>)> =
        query.order_by((meals::day, meals::id)).load(conn)?;
    let meals = rows
        .into_iter()
        .map(|(row, recipe_name)| Meal::from_row(row, recipe_name))
        .collect::<Result<_>>()?;
    Ok(MealCalendar { meals })
}

/// Every meal on or after `from`.
pub fn upcoming(conn: &mut database::Connection, from: chrono::NaiveDate) -> Result<MealCalendar> {
    load_calendar(conn, from, None)
}

/// Meals from `first` through `last`, both included.
pub fn between(
    conn: &mut database::Connection,
    first: chrono::NaiveDate,
    last: chrono::NaiveDate,
) -> Result<MealCalendar> {
    if last < first {
        return Err(Error::validation(
            "last",
            format!("{last} is before {first}"),
        ));
    }
    load_calendar(conn, first, Some(last))
}

/// The meals of one calendar week.
pub fn week(conn: &mut database::Connection, week: chrono::NaiveWeek) -> Result<MealCalendar> {
    between(conn, week.first_day(), week.last_day())
}

#[cfg(test)]
fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn a_meal_needs_a_recipe_or_a_name() {
    let mut conn = database::establish_in_memory().unwrap();
    let day = date(2024, 3, 4);

    let err = schedule_meal(&mut conn, &NewMeal { day, ..NewMeal::default() }).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "meal", .. }), "{err}");

    let err = schedule_meal(&mut conn, &NewMeal::named(day, "   ")).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "meal", .. }), "{err}");

    let recipe = recipes::create(&mut conn, &recipes::tests::new_recipe("Zaalouk", None)).unwrap();
    let both = NewMeal {
        name: Some("Leftovers".into()),
        ..NewMeal::recipe(day, recipe.id)
    };
    let err = schedule_meal(&mut conn, &both).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "meal", .. }), "{err}");

    let err = schedule_meal(&mut conn, &NewMeal::recipe(day, RecipeId(99))).unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "recipe", .. }), "{err}");

    let too_many = NewMeal {
        servings: Some(0),
        ..NewMeal::recipe(day, recipe.id)
    };
    let err = schedule_meal(&mut conn, &too_many).unwrap_err();
    assert!(matches!(err, Error::Validation { field: "servings", .. }), "{err}");

    assert!(upcoming(&mut conn, day).unwrap().is_empty());
}

#[test]
fn recipe_and_ad_hoc_meals() {
    let mut conn = database::establish_in_memory().unwrap();
    let day = date(2024, 3, 4);
    let recipe = recipes::create(&mut conn, &recipes::tests::new_recipe("Fish curry", None)).unwrap();

    let cooked = schedule_meal(
        &mut conn,
        &NewMeal {
            servings: Some(6),
            ..NewMeal::recipe(day, recipe.id)
        },
    )
    .unwrap();
    assert_eq!(
        cooked.kind,
        MealKind::Recipe {
            recipe: recipe.to_handle(),
            servings: Some(6)
        }
    );

    let eating_out = schedule_meal(
        &mut conn,
        &NewMeal {
            note: Some("Table for two at 19:00".into()),
            ..NewMeal::named(day, "Eating out")
        },
    )
    .unwrap();
    assert_eq!(eating_out.title(), "Eating out");

    let calendar = upcoming(&mut conn, day).unwrap();
    assert_eq!(calendar.meals(), [cooked, eating_out]);

    let err = recipes::delete(&mut conn, recipe.id).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err}");
}

#[test]
fn upcoming_skips_the_past_and_groups_by_day() {
    let mut conn = database::establish_in_memory().unwrap();
    let today = date(2024, 3, 4);

    for (day, name) in [
        (date(2024, 3, 6), "Pizza"),
        (date(2024, 3, 1), "Soup"),
        (today, "Tacos"),
        (date(2024, 3, 6), "Ice cream"),
        (date(2024, 3, 3), "Stew"),
    ] {
        schedule_meal(&mut conn, &NewMeal::named(day, name)).unwrap();
    }

    let calendar = upcoming(&mut conn, today).unwrap();
    assert!(calendar.meals().iter().all(|m| m.day >= today));

    let grouped: Vec<(chrono::NaiveDate, Vec<&str>)> = calendar
        .days()
        .map(|(day, meals)| (day, meals.iter().map(Meal::title).collect()))
        .collect();
    assert_eq!(
        grouped,
        [
            (today, vec!["Tacos"]),
            (date(2024, 3, 6), vec!["Pizza", "Ice cream"]),
        ]
    );
    assert_eq!(calendar.days().count(), 2);
}

#[test]
fn weeks_and_unscheduling() {
    let mut conn = database::establish_in_memory().unwrap();
    let sunday = date(2024, 3, 3);

    let stew = schedule_meal(&mut conn, &NewMeal::named(sunday, "Stew")).unwrap();
    schedule_meal(&mut conn, &NewMeal::named(date(2024, 3, 9), "Pizza")).unwrap();
    schedule_meal(&mut conn, &NewMeal::named(date(2024, 3, 10), "Tacos")).unwrap();

    let week_of = week(&mut conn, sunday.week(chrono::Weekday::Sun)).unwrap();
    let titles: Vec<_> = week_of.meals().iter().map(Meal::title).collect();
    assert_eq!(titles, ["Stew", "Pizza"]);

    let err = between(&mut conn, date(2024, 3, 9), sunday).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "{err}");

    unschedule(&mut conn, stew.id).unwrap();
    assert_eq!(between(&mut conn, sunday, sunday).unwrap().meals().len(), 0);
    let err = unschedule(&mut conn, stew.id).unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "meal", .. }), "{err}");
}
