use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use forecast_core::{
    Config, EmptySnapshots, Envelope, Favorite, FavoritesHolder, ForecastHolder, Repository,
    UnitPreference, UnitSystem, UnitsHolder, repository_from_config,
};

use crate::format::{render_favorites, render_forecast, render_units};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Daily weather forecast CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and the default city.
    Configure,

    /// Show the daily forecast for a city.
    Show {
        /// City name; the configured default city when omitted.
        city: Option<String>,

        /// "imperial" or "metric"; the stored preference when omitted.
        #[arg(long)]
        units: Option<String>,

        /// Also add the city to favorites.
        #[arg(long)]
        save: bool,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },

    /// Manage the preferred unit system.
    Units {
        #[command(subcommand)]
        action: UnitsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List saved cities.
    List,
    /// Save a city; an existing entry for it is replaced.
    Add { city: String, country: String },
    Remove { city: String },
}

#[derive(Debug, Subcommand)]
pub enum UnitsCommand {
    /// Show stored preferences and the unit system in effect.
    Show,
    /// Replace the stored preference; prompts when no unit is given.
    Set { unit: Option<String> },
    Clear,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, units, save } => show(city, units, save).await,
            Command::Favorites { action } => favorites(action).await,
            Command::Units { action } => units(action).await,
        }
    }
}

async fn open() -> anyhow::Result<(Config, Repository)> {
    let config = Config::load()?;
    let repository = repository_from_config(&config).await?;
    Ok((config, repository))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let city = inquire::Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Failed to read default city")?;
    config.default_city = city.trim().to_string();

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn show(city: Option<String>, units: Option<String>, save: bool) -> anyhow::Result<()> {
    let (config, repository) = open().await?;
    // Fail early with the configuration hint rather than after a request.
    config.api_key()?;

    let unit = match units {
        Some(u) => UnitSystem::try_from(u.as_str())?,
        None => UnitSystem::resolve(&repository.current_units().await),
    };
    let city = config.city_or_default(city.as_deref()).to_string();

    let mut holder = ForecastHolder::new(repository.clone(), config.default_city.clone());
    let mut state = holder.subscribe();
    holder.request(&city, unit);

    if matches!(&*state.borrow(), Some(e) if e.is_loading()) {
        eprintln!("Loading forecast for {city}...");
    }

    let settled = state
        .wait_for(|s| matches!(s, Some(e) if !e.is_loading()))
        .await
        .context("Forecast request was cancelled")?
        .clone();
    holder.shutdown().await;

    let forecast = match settled {
        Some(Envelope::Succeeded(forecast)) => forecast,
        Some(Envelope::Failed(err)) => {
            return Err(anyhow!(err))
                .with_context(|| format!("Could not load forecast for {city}"));
        }
        Some(Envelope::Loading) | None => bail!("Forecast request did not complete"),
    };

    print!("{}", render_forecast(&forecast, unit));

    if save {
        let favorite = Favorite::new(forecast.city.name.clone(), forecast.city.country.clone());
        add_favorite(&repository, favorite).await?;
    }

    Ok(())
}

async fn favorites(action: FavoritesCommand) -> anyhow::Result<()> {
    let (_, repository) = open().await?;

    match action {
        FavoritesCommand::List => {
            let holder = FavoritesHolder::favorites(repository, EmptySnapshots::Publish);
            let mut list = holder.subscribe();
            list.changed().await.context("Favorites subscription ended")?;

            print!("{}", render_favorites(&list.borrow_and_update()));
            holder.shutdown().await;
        }
        FavoritesCommand::Add { city, country } => {
            add_favorite(&repository, Favorite::new(city.trim(), country.trim())).await?;
        }
        FavoritesCommand::Remove { city } => {
            let current = repository.current_favorites().await;
            let Some(favorite) = current
                .into_iter()
                .find(|f| f.city.eq_ignore_ascii_case(city.trim()))
            else {
                bail!("'{city}' is not a favorite city");
            };

            let mut holder =
                FavoritesHolder::favorites(repository.clone(), EmptySnapshots::Publish);
            holder.delete_favorite(favorite.clone());
            holder.flush().await;
            holder.shutdown().await;

            let remaining = repository.current_favorites().await;
            if remaining.contains(&favorite) {
                bail!("Failed to remove {} from favorites", favorite.city);
            }
            println!("Removed {}, {} from favorites.", favorite.city, favorite.country);
        }
    }

    Ok(())
}

async fn add_favorite(repository: &Repository, favorite: Favorite) -> anyhow::Result<()> {
    if favorite.city.is_empty() {
        bail!("City must not be empty");
    }

    let mut holder = FavoritesHolder::favorites(repository.clone(), EmptySnapshots::Publish);
    holder.insert_favorite(favorite.clone());
    holder.flush().await;
    holder.shutdown().await;

    // Mutations report nothing back, so confirm against the store.
    let saved = repository.current_favorites().await;
    if !saved.contains(&favorite) {
        bail!("Failed to save {} to favorites", favorite.city);
    }
    println!("Added {}, {} to favorites.", favorite.city, favorite.country);

    Ok(())
}

async fn units(action: UnitsCommand) -> anyhow::Result<()> {
    let (_, repository) = open().await?;

    match action {
        UnitsCommand::Show => {
            print!("{}", render_units(&repository.current_units().await));
        }
        UnitsCommand::Set { unit } => {
            let unit = match unit {
                Some(u) => UnitSystem::try_from(u.as_str())?,
                None => inquire::Select::new("Unit system:", UnitSystem::all().to_vec())
                    .prompt()
                    .context("Failed to read unit system")?,
            };

            let mut holder = UnitsHolder::units(repository.clone(), EmptySnapshots::Skip);
            holder.delete_all_units();
            holder.flush().await;
            holder.insert_unit(UnitPreference::from(unit));
            holder.flush().await;
            holder.shutdown().await;

            let stored = repository.current_units().await;
            if UnitSystem::resolve(&stored) != unit || stored.is_empty() {
                bail!("Failed to store unit preference");
            }
            println!("Units set to {}.", unit.label());
        }
        UnitsCommand::Clear => {
            let mut holder = UnitsHolder::units(repository.clone(), EmptySnapshots::Skip);
            holder.delete_all_units();
            holder.flush().await;
            holder.shutdown().await;

            println!("Cleared unit preferences; using {}.", UnitSystem::default().label());
        }
    }

    Ok(())
}
