//! Deterministic forecast payloads and a controllable clock, used by the
//! test suites in place of the live upstream API.

use super::cache::Clock;
use super::types::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

const SAMPLE_DAY_EPOCH: i64 = 1_700_006_400; // 2023-11-15T00:00:00Z

/// Build a complete one-day forecast for `place` with a current temperature of 15°C.
pub fn sample_forecast(place: &str) -> ForecastResult {
    sample_forecast_with_temp(place, 15.0)
}

/// Same as [`sample_forecast`] but with a chosen current temperature, so tests
/// can tell two upstream responses apart.
pub fn sample_forecast_with_temp(place: &str, temp_c: f64) -> ForecastResult {
    let hour = (0..HOURS_PER_DAY as i64).map(sample_hour).collect();

    ForecastResult {
        location: Location {
            name: place.to_string(),
            region: "City of London, Greater London".to_string(),
            country: "United Kingdom".to_string(),
            lat: 51.52,
            lon: -0.11,
            tz_id: "Europe/London".to_string(),
            localtime_epoch: SAMPLE_DAY_EPOCH + 12 * 3600,
            localtime: "2023-11-15 12:00".to_string(),
        },
        current: Current {
            last_updated_epoch: SAMPLE_DAY_EPOCH + 11 * 3600 + 45 * 60,
            last_updated: "2023-11-15 11:45".to_string(),
            temp_c,
            temp_f: celsius_to_fahrenheit(temp_c),
            is_day: 1,
            condition: partly_cloudy(),
            wind_mph: 8.1,
            wind_kph: 13.0,
            wind_degree: 230,
            wind_dir: "SW".to_string(),
            pressure_mb: 1012.0,
            pressure_in: 29.88,
            precip_mm: 0.0,
            precip_in: 0.0,
            humidity: 72,
            cloud: 50,
            feelslike_c: temp_c - 1.5,
            feelslike_f: celsius_to_fahrenheit(temp_c - 1.5),
            vis_km: 10.0,
            vis_miles: 6.0,
            uv: 3.0,
            gust_mph: 12.5,
            gust_kph: 20.2,
        },
        forecast: Forecast {
            forecastday: vec![ForecastDay {
                date: "2023-11-15".to_string(),
                date_epoch: SAMPLE_DAY_EPOCH,
                day: Day {
                    maxtemp_c: 16.5,
                    maxtemp_f: 61.7,
                    mintemp_c: 9.0,
                    mintemp_f: 48.2,
                    avgtemp_c: 12.5,
                    avgtemp_f: 54.5,
                    maxwind_mph: 14.5,
                    maxwind_kph: 23.4,
                    totalprecip_mm: 1.2,
                    totalprecip_in: 0.05,
                    avgvis_km: 9.5,
                    avgvis_miles: 5.0,
                    avghumidity: 78.0,
                    daily_will_it_rain: 1,
                    daily_chance_of_rain: 81,
                    daily_will_it_snow: 0,
                    daily_chance_of_snow: 0,
                    condition: light_rain(),
                    uv: 3.0,
                },
                astro: Astro {
                    sunrise: "07:20 AM".to_string(),
                    sunset: "04:16 PM".to_string(),
                    moonrise: "09:41 AM".to_string(),
                    moonset: "05:32 PM".to_string(),
                    moon_phase: "Waxing Crescent".to_string(),
                    moon_illumination: "6".to_string(),
                },
                hour,
            }],
        },
    }
}

fn sample_hour(h: i64) -> Hour {
    let temp_c = 9.0 + (h as f64 - 2.0).clamp(0.0, 12.0) * 0.5;
    let is_day = (7..17).contains(&h);

    Hour {
        time_epoch: SAMPLE_DAY_EPOCH + h * 3600,
        time: format!("2023-11-15 {:02}:00", h),
        temp_c,
        temp_f: celsius_to_fahrenheit(temp_c),
        is_day: u8::from(is_day),
        condition: if h < 12 { partly_cloudy() } else { light_rain() },
        wind_mph: 7.5,
        wind_kph: 12.1,
        wind_degree: 220,
        wind_dir: "SW".to_string(),
        pressure_mb: 1012.0,
        pressure_in: 29.88,
        precip_mm: if h < 12 { 0.0 } else { 0.1 },
        precip_in: 0.0,
        humidity: 70 + (h % 10) as u32,
        cloud: 40 + (h % 5) as u32 * 10,
        feelslike_c: temp_c - 2.0,
        feelslike_f: celsius_to_fahrenheit(temp_c - 2.0),
        windchill_c: temp_c - 2.0,
        windchill_f: celsius_to_fahrenheit(temp_c - 2.0),
        heatindex_c: temp_c,
        heatindex_f: celsius_to_fahrenheit(temp_c),
        dewpoint_c: 6.5,
        dewpoint_f: 43.7,
        will_it_rain: u8::from(h >= 12),
        chance_of_rain: if h >= 12 { 81 } else { 0 },
        will_it_snow: 0,
        chance_of_snow: 0,
        vis_km: 10.0,
        vis_miles: 6.0,
        gust_mph: 11.0,
        gust_kph: 17.8,
        uv: if is_day { 2.0 } else { 1.0 },
    }
}

fn partly_cloudy() -> Condition {
    Condition {
        text: "Partly cloudy".to_string(),
        icon: "//cdn.weatherapi.com/weather/64x64/day/116.png".to_string(),
        code: 1003,
    }
}

fn light_rain() -> Condition {
    Condition {
        text: "Patchy rain possible".to_string(),
        icon: "//cdn.weatherapi.com/weather/64x64/day/176.png".to_string(),
        code: 1063,
    }
}

fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// A [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now_millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now_millis: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.now_millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_hours_are_sequential() {
        let forecast = sample_forecast("Paris");
        let hours = &forecast.forecast.forecastday[0].hour;

        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0].time, "2023-11-15 00:00");
        assert_eq!(hours[23].time, "2023-11-15 23:00");
        assert!(hours.windows(2).all(|w| w[1].time_epoch - w[0].time_epoch == 3600));
    }

    #[test]
    fn test_sample_forecast_with_temp() {
        let forecast = sample_forecast_with_temp("Paris", 20.0);
        assert_eq!(forecast.location.name, "Paris");
        assert_eq!(forecast.current.temp_c, 20.0);
        assert_eq!(forecast.current.temp_f, 68.0);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now_millis(), 2_000);

        clock.set(5);
        assert_eq!(clock.now_millis(), 5);
    }
}
