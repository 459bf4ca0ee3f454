//! Mock health data generation.
//!
//! There is no device integration yet; the health routes serve generated
//! data with realistic correlations (distance follows steps, heart rate
//! follows activity and stress, blood pressure follows stress).

use chrono::{Duration, Local, Utc};
use rand::Rng;
use shared_types::{HealthData, HealthOverviewResponse, Workout};

const SPORT_OPTIONS: [&str; 3] = ["pickleball", "swim", "running"];

/// Calories burned per minute for each sport.
fn burn_rate(sport: &str) -> f64 {
    match sport {
        "pickleball" => 9.0,
        "swim" => 10.5,
        "running" => 11.5,
        _ => 8.0,
    }
}

pub struct HealthDataGenerator;

impl HealthDataGenerator {
    /// Generate one day of correlated health data.
    pub fn generate_realistic() -> HealthData {
        let mut rng = rand::thread_rng();

        let steps: u32 = rng.gen_range(3000..=15000);
        let distance_meters = (steps as f64 * 0.7) as u32;
        let calories_burned = (steps as f64 * 0.1) as u32 + rng.gen_range(500..=1000);

        let sleep_duration = (rng.gen_range(6.0..=9.0_f64) * 10.0).round() / 10.0;
        let sleep_quality: u32 = rng.gen_range(60..=95);

        let stress_score: u32 = rng.gen_range(20..=80);

        let activity_factor = steps as f64 / 10_000.0;
        let stress_factor = rng.gen_range(10..=50) as f64;
        let heart_rate = (60.0 + activity_factor * 20.0 + stress_factor * 0.3) as u32;

        let stress_effect = (stress_score as f64 - 50.0) * 0.5;
        let bp_systolic =
            (110.0 + stress_effect + rng.gen_range(-10..=10) as f64).max(80.0) as u32;
        let bp_diastolic =
            (70.0 + stress_effect * 0.6 + rng.gen_range(-5..=5) as f64).max(50.0) as u32;

        let blood_glucose =
            (90.0 + (steps as f64 / 1000.0) * 5.0 + rng.gen_range(-20..=20) as f64) as u32;
        let blood_oxygen: u32 = rng.gen_range(95..=100);

        HealthData {
            steps,
            distance_meters,
            calories_burned,
            sleep_duration,
            sleep_quality,
            heart_rate,
            stress_score,
            bp_systolic,
            bp_diastolic,
            blood_pressure: format!("{bp_systolic}/{bp_diastolic}"),
            blood_glucose,
            blood_oxygen,
            timestamp: Utc::now(),
            weekly_workouts: Self::weekly_workout_history(7),
        }
    }

    /// One workout per day for the trailing `days` days.
    pub fn weekly_workout_history(days: u32) -> Vec<Workout> {
        let mut rng = rand::thread_rng();
        let today = Local::now().date_naive();

        (0..days)
            .map(|offset| {
                let sport = SPORT_OPTIONS[rng.gen_range(0..SPORT_OPTIONS.len())];
                let duration_minutes: u32 = rng.gen_range(30..=75);
                Workout {
                    date: today - Duration::days(offset as i64),
                    sport: sport.to_string(),
                    duration_minutes,
                    calories: (duration_minutes as f64 * burn_rate(sport)) as u32,
                }
            })
            .collect()
    }

    /// Overview summary served by GET /health/overview.
    pub fn overview() -> HealthOverviewResponse {
        let data = Self::generate_realistic();
        let emotional_wellbeing_state = match data.stress_score {
            0..=35 => "Great",
            36..=60 => "Good",
            61..=80 => "Strained",
            _ => "Stressed",
        };

        HealthOverviewResponse {
            sleep_hours: data.sleep_duration,
            sleep_score: data.sleep_quality,
            steps_count: data.steps,
            heart_rate: data.heart_rate,
            emotional_wellbeing_state: emotional_wellbeing_state.to_string(),
            ai_insights: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_data_within_ranges() {
        for _ in 0..50 {
            let data = HealthDataGenerator::generate_realistic();
            assert!((3000..=15000).contains(&data.steps));
            assert_eq!(data.distance_meters, (data.steps as f64 * 0.7) as u32);
            assert!((6.0..=9.0).contains(&data.sleep_duration));
            assert!((95..=100).contains(&data.blood_oxygen));
            assert_eq!(
                data.blood_pressure,
                format!("{}/{}", data.bp_systolic, data.bp_diastolic)
            );
        }
    }

    #[test]
    fn test_workout_history_has_one_entry_per_day() {
        let history = HealthDataGenerator::weekly_workout_history(7);
        assert_eq!(history.len(), 7);
        for workout in &history {
            assert!(SPORT_OPTIONS.contains(&workout.sport.as_str()));
            assert!((30..=75).contains(&workout.duration_minutes));
            assert!(workout.calories > 0);
        }
    }
}
