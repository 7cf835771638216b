// Copyright 2023 Remi Bernotavicius

use crate::recipes::RatingFormula;
use std::path::PathBuf;

const DEFAULT_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "gif", "png", "bmp"];
const DEFAULT_LANGUAGES: [&str; 2] = ["en", "nl"];

#[derive(clap::Args, Debug, Clone)]
pub struct Config {
    /// SQLite database file. Defaults to `data.sqlite` in the user data directory.
    #[arg(long, env = "RECIPE_LEDGER_DATABASE")]
    pub database: Option<PathBuf>,

    /// File extensions accepted for recipe images.
    #[arg(
        long = "image-extension",
        env = "RECIPE_LEDGER_IMAGE_EXTENSIONS",
        value_delimiter = ',',
        default_values = DEFAULT_IMAGE_EXTENSIONS
    )]
    pub image_extensions: Vec<String>,

    #[arg(
        long = "language",
        env = "RECIPE_LEDGER_LANGUAGES",
        value_delimiter = ',',
        default_values = DEFAULT_LANGUAGES
    )]
    pub languages: Vec<String>,

    #[arg(long, env = "RECIPE_LEDGER_BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    #[arg(long, env = "RECIPE_LEDGER_RATING_FORMULA", value_enum, default_value_t)]
    pub rating_formula: RatingFormula,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.map(String::from).to_vec(),
            languages: DEFAULT_LANGUAGES.map(String::from).to_vec(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            rating_formula: RatingFormula::default(),
        }
    }
}

impl Config {
    pub fn database_path(&self) -> crate::Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(data_path()?.join("data.sqlite")),
        }
    }

    pub fn is_allowed_image_extension(&self, extension: &str) -> bool {
        self.image_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/recipe_ledger/`
pub fn data_path() -> crate::Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        crate::Error::not_found("home directory", "for the current user")
    })?;
    let path = dirs.data_dir().join("recipe_ledger");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

#[test]
fn image_extensions_ignore_case() {
    let config = Config::default();
    assert!(config.is_allowed_image_extension("JPG"));
    assert!(config.is_allowed_image_extension("png"));
    assert!(!config.is_allowed_image_extension("exe"));
}

#[test]
fn explicit_database_path_wins() {
    let config = Config {
        database: Some("/tmp/elsewhere.sqlite".into()),
        ..Config::default()
    };
    assert_eq!(
        config.database_path().unwrap(),
        PathBuf::from("/tmp/elsewhere.sqlite")
    );
}
