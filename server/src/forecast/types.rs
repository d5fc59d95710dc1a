use serde::{Deserialize, Deserializer, Serialize};

/// Number of hourly entries every forecast day must carry.
pub const HOURS_PER_DAY: usize = 24;

/// Full payload of the upstream `forecast.json` endpoint.
///
/// Field names mirror the upstream schema verbatim, including the paired
/// metric/imperial suffixes (`_c`/`_f`, `_mm`/`_in`, `_kph`/`_mph`, `_km`/`_miles`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location: Location,
    pub current: Current,
    pub forecast: Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub tz_id: String,
    pub localtime_epoch: i64,
    pub localtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub last_updated_epoch: i64,
    pub last_updated: String,
    pub temp_c: f64,
    pub temp_f: f64,
    pub is_day: u8,
    pub condition: Condition,
    pub wind_mph: f64,
    pub wind_kph: f64,
    pub wind_degree: i32,
    pub wind_dir: String,
    pub pressure_mb: f64,
    pub pressure_in: f64,
    pub precip_mm: f64,
    pub precip_in: f64,
    pub humidity: u32,
    pub cloud: u32,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    pub vis_km: f64,
    pub vis_miles: f64,
    pub uv: f64,
    pub gust_mph: f64,
    pub gust_kph: f64,
}

/// Day-level aggregates for one forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub maxtemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_c: f64,
    pub mintemp_f: f64,
    pub avgtemp_c: f64,
    pub avgtemp_f: f64,
    pub maxwind_mph: f64,
    pub maxwind_kph: f64,
    pub totalprecip_mm: f64,
    pub totalprecip_in: f64,
    pub avgvis_km: f64,
    pub avgvis_miles: f64,
    pub avghumidity: f64,
    pub daily_will_it_rain: u8,
    pub daily_chance_of_rain: u32,
    pub daily_will_it_snow: u8,
    pub daily_chance_of_snow: u32,
    pub condition: Condition,
    pub uv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
    pub moonrise: String,
    pub moonset: String,
    pub moon_phase: String,
    /// Sent as a string by the forecast endpoint and as a number by the astronomy one.
    #[serde(deserialize_with = "string_or_number")]
    pub moon_illumination: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hour {
    pub time_epoch: i64,
    pub time: String,
    pub temp_c: f64,
    pub temp_f: f64,
    pub is_day: u8,
    pub condition: Condition,
    pub wind_mph: f64,
    pub wind_kph: f64,
    pub wind_degree: i32,
    pub wind_dir: String,
    pub pressure_mb: f64,
    pub pressure_in: f64,
    pub precip_mm: f64,
    pub precip_in: f64,
    pub humidity: u32,
    pub cloud: u32,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    pub windchill_c: f64,
    pub windchill_f: f64,
    pub heatindex_c: f64,
    pub heatindex_f: f64,
    pub dewpoint_c: f64,
    pub dewpoint_f: f64,
    pub will_it_rain: u8,
    pub chance_of_rain: u32,
    pub will_it_snow: u8,
    pub chance_of_snow: u32,
    pub vis_km: f64,
    pub vis_miles: f64,
    pub gust_mph: f64,
    pub gust_kph: f64,
    pub uv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub date_epoch: i64,
    pub day: Day,
    pub astro: Astro,
    pub hour: Vec<Hour>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

impl ForecastResult {
    /// Check invariants serde cannot express: hour counts, percentage ranges
    /// and a named location. Returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.location.name.trim().is_empty() {
            return Err("location.name is empty".to_string());
        }

        check_percent("current.humidity", self.current.humidity as f64)?;
        check_percent("current.cloud", self.current.cloud as f64)?;

        for day in &self.forecast.forecastday {
            if day.hour.len() != HOURS_PER_DAY {
                return Err(format!(
                    "forecastday {} has {} hourly entries, expected {}",
                    day.date,
                    day.hour.len(),
                    HOURS_PER_DAY
                ));
            }

            check_percent("day.avghumidity", day.day.avghumidity)?;
            check_percent("day.daily_chance_of_rain", day.day.daily_chance_of_rain as f64)?;
            check_percent("day.daily_chance_of_snow", day.day.daily_chance_of_snow as f64)?;

            for hour in &day.hour {
                check_percent("hour.humidity", hour.humidity as f64)?;
                check_percent("hour.cloud", hour.cloud as f64)?;
                check_percent("hour.chance_of_rain", hour.chance_of_rain as f64)?;
                check_percent("hour.chance_of_snow", hour.chance_of_snow as f64)?;
            }
        }

        Ok(())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

fn check_percent(field: &str, value: f64) -> Result<(), String> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} out of range: {}", field, value))
    }
}
