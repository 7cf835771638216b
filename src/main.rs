// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use recipe_ledger::config::Config;
use recipe_ledger::database::models::{RecipeId, UserId};
use recipe_ledger::fixtures::DemoData;
use recipe_ledger::meals::MealKind;
use recipe_ledger::recipes::RecipeFilter;
use recipe_ledger::{database, meals, recipes, settings, users};

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    config: Config,

    #[arg(long, env = "RECIPE_LEDGER_LOG_LEVEL", default_value_t = log::LevelFilter::Info)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the database or bring it up to date.
    Migrate,
    /// Fill an empty database with sample recipes and meals.
    SeedDemo,
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Show a recipe with its ingredients.
    Show { recipe: i32 },
    /// List meals from a day on, today by default.
    Upcoming {
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
    Rate {
        recipe: i32,
        user: i32,
        rating: i32,
    },
    /// Print a user's settings, defaults included.
    Settings { user: i32 },
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn search(conn: &mut database::Connection, filter: RecipeFilter) -> Result<()> {
    for recipe in recipes::search(conn, &filter)? {
        let rating = recipe
            .average_rating()
            .map(|r| format!("{r:.1} ({})", recipe.rating_count))
            .unwrap_or_else(|| "unrated".into());
        println!("{:>5}  {}  [{rating}]", recipe.id, recipe.name);
    }
    Ok(())
}

fn show(conn: &mut database::Connection, id: RecipeId) -> Result<()> {
    let aggregate = recipes::get(conn, id)?;
    let recipe = &aggregate.recipe;
    println!("{} by {}", recipe.name, recipe.author);
    if let Some(category) = &aggregate.category {
        println!("category: {}", category.name);
    }
    if !aggregate.tags.is_empty() {
        let tags: Vec<_> = aggregate.tags.iter().map(|t| t.name.as_str()).collect();
        println!("tags: {}", tags.join(", "));
    }
    println!(
        "serves {}, {} min prep, {} min cooking\n",
        recipe.servings, recipe.prep_time, recipe.cook_time
    );
    for line in &aggregate.ingredients {
        print!("  {} {} {}", line.quantity, line.ingredient.unit, line.ingredient.name);
        if let Some(alternate) = line.alternate_quantity {
            print!(" ({alternate})");
        }
        println!();
    }
    for paragraph in aggregate.paragraphs() {
        println!("\n{paragraph}");
    }
    Ok(())
}

fn upcoming(conn: &mut database::Connection, from: chrono::NaiveDate) -> Result<()> {
    let calendar = meals::upcoming(conn, from)?;
    for (day, meals) in calendar.days() {
        println!("{}", day.format("%A %e %B %Y"));
        for meal in meals {
            match &meal.kind {
                MealKind::Recipe {
                    recipe,
                    servings: Some(servings),
                } => println!("  {} (serves {servings})", recipe.name),
                MealKind::Recipe { recipe, .. } => println!("  {}", recipe.name),
                MealKind::AdHoc {
                    name,
                    note: Some(note),
                } => println!("  {name}: {note}"),
                MealKind::AdHoc { name, .. } => println!("  {name}"),
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .init()?;

    let config = args.config;
    let mut conn = database::establish_connection(config.database_path()?)?;
    let conn = &mut conn;
    match args.commands {
        Commands::Migrate => log::info!("database is up to date"),
        Commands::SeedDemo => {
            let demo = DemoData::seed(conn, today(), config.bcrypt_cost)?;
            println!(
                "added {} recipes, log in as {:?}",
                demo.recipes.len(),
                demo.user.name
            );
        }
        Commands::Search {
            query,
            categories,
            tags,
        } => search(
            conn,
            RecipeFilter::new(query).categories(categories).tags(tags),
        )?,
        Commands::Show { recipe } => show(conn, RecipeId(recipe))?,
        Commands::Upcoming { from } => upcoming(conn, from.unwrap_or_else(today))?,
        Commands::Register {
            name,
            email,
            password,
        } => {
            let user = users::register(conn, &name, &email, &password, config.bcrypt_cost)?;
            println!("registered user {}", user.id);
        }
        Commands::Rate {
            recipe,
            user,
            rating,
        } => {
            let recipe = recipes::record_rating(
                conn,
                RecipeId(recipe),
                UserId(user),
                rating,
                config.rating_formula,
            )?;
            println!(
                "{} is now rated {:.1} by {} user(s)",
                recipe.name, recipe.rating, recipe.rating_count
            );
        }
        Commands::Settings { user } => {
            for (name, value) in settings::effective_settings(conn, UserId(user))? {
                println!("{name} = {value}");
            }
            println!("available languages = {}", config.languages.join(", "));
        }
    }
    Ok(())
}
