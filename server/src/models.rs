//! Model source loading.
//!
//! A model source is a JSON file holding one declaration or an array of
//! them, or a directory whose `*.json` files are read in filename order.

use crate::config::ConfigError;
use mockbase_engine::{ModelSchema, Schema};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum Declarations {
    Many(Vec<ModelSchema>),
    One(ModelSchema),
}

/// Load and check every model declared at `path`.
pub fn load_models(path: &Path) -> Result<Schema, ConfigError> {
    let files = if path.is_dir() {
        json_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut models = Vec::new();
    for file in files {
        let json = fs::read_to_string(&file).map_err(|e| source_error(&file, e))?;
        models.extend(parse_models(&json).map_err(|e| source_error(&file, e))?);
    }

    Ok(Schema::from_models(models)?)
}

/// Parse one JSON document of declarations.
pub fn parse_models(json: &str) -> Result<Vec<ModelSchema>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        Declarations::Many(models) => models,
        Declarations::One(model) => vec![model],
    })
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| source_error(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn source_error(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::ModelSource {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
