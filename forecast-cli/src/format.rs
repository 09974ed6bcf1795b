use std::fmt::Write;

use chrono::{DateTime, FixedOffset};
use forecast_core::{Favorite, Forecast, UnitPreference, UnitSystem};

/// Timestamp shifted into the city's UTC offset; falls back to UTC.
fn local_time(ts: i64, offset_secs: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(offset_secs).or_else(|| FixedOffset::east_opt(0))?;
    DateTime::from_timestamp(ts, 0).map(|dt| dt.with_timezone(&offset))
}

/// `Wed, Oct 18`
pub fn format_date(ts: i64, offset_secs: i32) -> String {
    local_time(ts, offset_secs)
        .map(|dt| dt.format("%a, %b %-d").to_string())
        .unwrap_or_default()
}

/// `07:40 AM`
pub fn format_date_time(ts: i64, offset_secs: i32) -> String {
    local_time(ts, offset_secs)
        .map(|dt| dt.format("%I:%M %p").to_string())
        .unwrap_or_default()
}

/// Whole number, never `-0`.
pub fn format_decimals(value: f64) -> String {
    let rounded = value.round();
    if rounded == 0.0 { "0".to_string() } else { format!("{rounded:.0}") }
}

pub fn render_forecast(forecast: &Forecast, unit: UnitSystem) -> String {
    let tz = forecast.city.timezone;
    let mut out = String::new();

    let _ = writeln!(out, "{}", forecast.location_name());

    let Some(today) = forecast.today() else {
        let _ = writeln!(out, "No forecast data.");
        return out;
    };

    let description = today.condition().map(|c| c.description.as_str()).unwrap_or("unknown");

    let _ = writeln!(out, "{}", format_date(today.dt, tz));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {}{}  {}",
        format_decimals(today.temp.day),
        unit.temperature_symbol(),
        description
    );
    let _ = writeln!(
        out,
        "  Humidity {}%   Pressure {} hPa   Wind {} {}",
        today.humidity,
        today.pressure,
        format_decimals(today.speed),
        unit.wind_speed_unit()
    );
    let _ = writeln!(
        out,
        "  Sunrise {}   Sunset {}",
        format_date_time(today.sunrise, tz),
        format_date_time(today.sunset, tz)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "This Week");
    for day in &forecast.list {
        let weekday = format_date(day.dt, tz);
        let weekday = weekday.split(',').next().unwrap_or_default();
        let description = day.condition().map(|c| c.description.as_str()).unwrap_or("unknown");

        let _ = writeln!(
            out,
            "  {weekday:<4} {description:<20} {}°/{}°",
            format_decimals(day.temp.max),
            format_decimals(day.temp.min)
        );
    }

    out
}

pub fn render_favorites(favorites: &[Favorite]) -> String {
    if favorites.is_empty() {
        return "No favorite cities yet.\n".to_string();
    }

    let width = favorites.iter().map(|f| f.city.chars().count()).max().unwrap_or(0);
    favorites
        .iter()
        .map(|f| format!("{:<width$}  {}\n", f.city, f.country))
        .collect()
}

pub fn render_units(units: &[UnitPreference]) -> String {
    let active = UnitSystem::resolve(units);

    if units.is_empty() {
        return format!("No unit preference stored; using {}.\n", active.label());
    }

    let mut out = String::new();
    for unit in units {
        let _ = writeln!(out, "{}", unit.unit);
    }
    let _ = writeln!(out, "Active: {active}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{
        DailyForecast,
        model::{City, Condition, Coord, FeelsLike, Temperature},
    };

    // 2023-10-18 20:00:00 UTC
    const TS: i64 = 1_697_659_200;

    fn day(dt: i64, max: f64, min: f64, description: &str) -> DailyForecast {
        DailyForecast {
            dt,
            sunrise: 1_697_640_012,
            sunset: 1_697_678_493,
            temp: Temperature {
                day: 58.4,
                min,
                max,
                night: 0.0,
                eve: 0.0,
                morn: 0.0,
            },
            feels_like: FeelsLike::default(),
            pressure: 1017,
            humidity: 78,
            weather: vec![Condition {
                id: 500,
                main: "Rain".into(),
                description: description.into(),
                icon: "10d".into(),
            }],
            speed: 6.4,
            deg: 190,
            gust: 0.0,
            clouds: 90,
            pop: 0.0,
            rain: None,
        }
    }

    fn seattle() -> Forecast {
        Forecast {
            city: City {
                id: 1,
                name: "Seattle".into(),
                country: "US".into(),
                coord: Coord::default(),
                population: 0,
                timezone: -25_200,
            },
            cnt: 2,
            cod: "200".into(),
            message: 0.0,
            list: vec![
                day(TS, 60.2, 49.3, "light rain"),
                day(TS + 86_400, 63.5, 50.0, "sky is clear"),
            ],
        }
    }

    #[test]
    fn dates_use_the_city_offset() {
        assert_eq!(format_date(TS, 0), "Wed, Oct 18");
        assert_eq!(format_date_time(TS, 0), "08:00 PM");
        assert_eq!(format_date_time(TS, -25_200), "01:00 PM");
    }

    #[test]
    fn decimals_are_rounded() {
        assert_eq!(format_decimals(58.6), "59");
        assert_eq!(format_decimals(-0.3), "0");
        assert_eq!(format_decimals(-4.5), "-5");
    }

    #[test]
    fn forecast_render_has_header_and_week() {
        let text = render_forecast(&seattle(), UnitSystem::Imperial);

        assert!(text.starts_with("Seattle, US\nWed, Oct 18\n"));
        assert!(text.contains("58°F  light rain"));
        assert!(text.contains("Wind 6 mph"));
        assert!(text.contains("This Week"));
        assert!(text.contains("Thu  sky is clear"));
        assert!(text.contains("64°/50°"));
    }

    #[test]
    fn empty_forecast_renders_placeholder() {
        let mut forecast = seattle();
        forecast.list.clear();

        assert_eq!(
            render_forecast(&forecast, UnitSystem::Metric),
            "Seattle, US\nNo forecast data.\n"
        );
    }

    #[test]
    fn favorites_are_aligned() {
        let favorites = vec![Favorite::new("Paris", "France"), Favorite::new("Rio", "Brazil")];
        assert_eq!(render_favorites(&favorites), "Paris  France\nRio    Brazil\n");
        assert_eq!(render_favorites(&[]), "No favorite cities yet.\n");
    }

    #[test]
    fn units_render_active_system() {
        assert_eq!(render_units(&[]), "No unit preference stored; using Imperial (F).\n");
        assert_eq!(
            render_units(&[UnitPreference::new("Metric (C)")]),
            "Metric (C)\nActive: metric\n"
        );
    }
}
