// Copyright 2023 Remi Bernotavicius

//! Sample data for trying the application out on an empty database.

use crate::database;
use crate::database::models::{Category, Ingredient, Recipe, Tag, UnitOfMeasure, User};
use crate::meals::{self, Meal, NewMeal};
use crate::recipes::{self, IngredientLine, NewRecipe};
use crate::{catalog, ingredients, settings, users, Error, Result};
use diesel::Connection as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;

pub const DEMO_USER: &str = "SueChef";
pub const DEMO_PASSWORD: &str = "suechef";

const PLACEHOLDER_DIRECTIONS: &str = "Start with bla bla and then\nDo some more steps\n\nEnjoy!";

/// Everything [`DemoData::seed`] created.
#[derive(Debug, Clone)]
pub struct DemoData {
    pub user: User,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
    pub recipes: Vec<Recipe>,
    pub meals: Vec<Meal>,
}

fn is_empty(conn: &mut database::Connection) -> Result<bool> {
    use database::schema::{categories, ingredients, meals, recipes, tags, users};

    let counts: [i64; 6] = [
        categories::table.count().get_result(conn)?,
        tags::table.count().get_result(conn)?,
        ingredients::table.count().get_result(conn)?,
        recipes::table.count().get_result(conn)?,
        meals::table.count().get_result(conn)?,
        users::table.count().get_result(conn)?,
    ];
    Ok(counts.iter().all(|&c| c == 0))
}

fn demo_recipe(
    name: &str,
    intro: &str,
    (prep_time, cook_time): (i32, i32),
    category: &Category,
    user: &User,
) -> NewRecipe {
    NewRecipe {
        name: name.into(),
        author: DEMO_USER.into(),
        intro: intro.into(),
        description: "a description.".into(),
        directions: PLACEHOLDER_DIRECTIONS.into(),
        prep_time,
        cook_time,
        servings: 4,
        image: None,
        published: true,
        category_id: Some(category.id),
        tags: vec![],
        ingredients: vec![],
        created_by: Some(user.id),
    }
}

impl DemoData {
    /// Fills an empty database with a demo user, reference data, recipes and a week of meals
    /// starting `today`. Refuses with `Conflict` when the database already holds data.
    pub fn seed(
        conn: &mut database::Connection,
        today: chrono::NaiveDate,
        hash_cost: u32,
    ) -> Result<Self> {
        conn.transaction(|conn| {
            if !is_empty(conn)? {
                return Err(Error::Conflict(
                    "demo data only goes into an empty database".into(),
                ));
            }

            let user = users::register(
                conn,
                DEMO_USER,
                "suechef@example.com",
                DEMO_PASSWORD,
                hash_cost,
            )?;
            settings::replace_settings(
                conn,
                user.id,
                [
                    ("grocery_day", "sat"),
                    ("default_servings", "2"),
                    ("allow_user_registration", "true"),
                    ("default_language", "en"),
                ],
            )?;

            let categories = ["Starter", "Main", "Side dish", "Desert", "Breakfast", "Lunch"]
                .into_iter()
                .map(|n| catalog::add_category(conn, n))
                .collect::<Result<Vec<_>>>()?;
            let tags = ["Vegetarian", "Indian", "Italian", "Moroccan", "Lactose free"]
                .into_iter()
                .map(|n| catalog::add_tag(conn, n))
                .collect::<Result<Vec<_>>>()?;
            let ingredients = [
                ("Rice", UnitOfMeasure::Grams),
                ("Curry paste", UnitOfMeasure::Teaspoons),
                ("White fish", UnitOfMeasure::Grams),
                ("Coconut milk", UnitOfMeasure::Milliliters),
                ("Coriander", UnitOfMeasure::Grams),
                ("Eggplant", UnitOfMeasure::Pieces),
                ("Tomato", UnitOfMeasure::Pieces),
            ]
            .into_iter()
            .map(|(n, u)| ingredients::add_ingredient(conn, n, u))
            .collect::<Result<Vec<_>>>()?;

            let (main, side_dish) = (&categories[1], &categories[2]);
            let (indian, moroccan, lactose) = (&tags[1], &tags[3], &tags[4]);
            let [rice, paste, fish, coconut, coriander, eggplant, tomato] = [0, 1, 2, 3, 4, 5, 6]
                .map(|i| ingredients[i].id);

            let mut curry = demo_recipe(
                "Fish curry",
                "A delicious but simple curry",
                (15, 30),
                main,
                &user,
            );
            curry.directions = "Wash and cook the rice.\n\nStart with oil and fry the paste for 5 \
                minutes. Add the fish and coconut milk. Poach fish until tender. Finalize with \
                coriander."
                .into();
            curry.tags = vec![indian.id, lactose.id];
            curry.ingredients = vec![
                IngredientLine::new(rice, 320.0),
                IngredientLine::new(paste, 3.0).with_alternate(0.75),
                IngredientLine::new(fish, 400.0),
                IngredientLine::new(coconut, 150.0),
                IngredientLine::new(coriander, 20.0),
            ];

            let mut zaalouk = demo_recipe(
                "Zaalouk",
                "Moroccan Vegetable side dish",
                (15, 20),
                side_dish,
                &user,
            );
            zaalouk.directions = "Cut the eggplants to cubes, if you like you can peel the \
                eggplant not completely you leave some skin on them for the dark look.\n\nCut the \
                tomato to fine slices"
                .into();
            zaalouk.tags = vec![moroccan.id];
            zaalouk.ingredients = vec![
                IngredientLine::new(eggplant, 2.0),
                IngredientLine::new(tomato, 3.0),
            ];

            let weekend = "Something truly the waiting for during a weekend";
            let recipes = [
                curry,
                demo_recipe(
                    "Pasta something",
                    "Quick pasta for a working day meal",
                    (20, 15),
                    main,
                    &user,
                ),
                demo_recipe("Weekend tajine", weekend, (30, 60), main, &user),
                zaalouk,
                demo_recipe(
                    "A very long title with multiple words",
                    weekend,
                    (30, 60),
                    main,
                    &user,
                ),
            ]
            .iter()
            .map(|r| recipes::create(conn, r))
            .collect::<Result<Vec<_>>>()?;

            let day = |offset: u64| today + chrono::Days::new(offset);
            let (curry, pasta, tajine, zaalouk) =
                (recipes[0].id, recipes[1].id, recipes[2].id, recipes[3].id);
            let planned = [
                NewMeal::recipe(day(0), curry),
                NewMeal::recipe(day(1), pasta),
                NewMeal {
                    note: Some("Use rocket salad from yesterday".into()),
                    ..NewMeal::named(day(1), "Green salad")
                },
                NewMeal {
                    note: Some("Rösti from freezer, check lamb first!".into()),
                    ..NewMeal::named(day(2), "Rösti with lamb and red cabbage")
                },
                NewMeal {
                    servings: Some(4),
                    ..NewMeal::recipe(day(3), tajine)
                },
                NewMeal::named(day(4), "Chicken biryani"),
                NewMeal::recipe(day(5), tajine),
                NewMeal::recipe(day(5), zaalouk),
            ];
            let meals = planned
                .iter()
                .map(|m| meals::schedule_meal(conn, m))
                .collect::<Result<Vec<_>>>()?;

            log::info!(
                "seeded {} recipe(s) and {} meal(s) for {DEMO_USER}",
                recipes.len(),
                meals.len()
            );
            Ok(Self {
                user,
                categories,
                tags,
                ingredients,
                recipes,
                meals,
            })
        })
    }
}

#[test]
fn seed_fills_an_empty_database() {
    let mut conn = database::establish_in_memory().unwrap();
    let today = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    let demo = DemoData::seed(&mut conn, today, users::TEST_HASH_COST).unwrap();
    assert_eq!(demo.categories.len(), 6);
    assert_eq!(demo.tags.len(), 5);
    assert_eq!(recipes::count_recipes(&mut conn).unwrap(), 5);

    let calendar = meals::upcoming(&mut conn, today).unwrap();
    assert_eq!(calendar.meals().len(), 8);
    assert_eq!(calendar.days().count(), 6);

    let found = recipes::search(&mut conn, &recipes::RecipeFilter::new("fish curry")).unwrap();
    assert_eq!(found.len(), 1);
    let curry = recipes::get(&mut conn, found[0].id).unwrap();
    assert_eq!(curry.ingredients.len(), 5);

    users::authenticate(&mut conn, DEMO_USER, DEMO_PASSWORD).unwrap();
    let entry = users::ledger_entry(&mut conn, demo.user.id, curry.recipe.id)
        .unwrap()
        .unwrap();
    assert!(!entry.is_rated());
}

#[test]
fn seed_refuses_existing_data() {
    let mut conn = database::establish_in_memory().unwrap();
    catalog::add_tag(&mut conn, "Mine").unwrap();

    let today = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let err = DemoData::seed(&mut conn, today, users::TEST_HASH_COST).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err}");
    assert_eq!(catalog::count_tags(&mut conn).unwrap(), 1);
    assert_eq!(recipes::count_recipes(&mut conn).unwrap(), 0);
}
