//! # SM-2 복습 스케줄러
//!
//! 카드의 현재 상태와 사용자가 매긴 기억 품질 점수(0~5)를 받아
//! 다음 상태를 계산하는 **순수 함수**들입니다. DB나 현재 시각에 의존하지 않으므로
//! 같은 입력에는 항상 같은 결과가 나옵니다.
//!
//! ## 점수(rating)의 의미
//! | 점수 | 의미 |
//! |------|------|
//! | 5 | 즉시 완벽하게 기억 |
//! | 4 | 잠시 망설인 뒤 정답 |
//! | 3 | 어렵게 정답 |
//! | 2 | 틀렸지만 익숙함 |
//! | 1 | 틀림, 어렴풋이 익숙함 |
//! | 0 | 전혀 기억나지 않음 |
//!
//! ## 계산 규칙
//! 1. `EF' = EF + (0.1 − (5 − r) × (0.08 + (5 − r) × 0.02))`, 1.3 미만이면 1.3
//! 2. r ≥ 3 (성공): 반복 횟수 +1, 간격은 1회차 1일 → 2회차 6일 → 이후 `round(이전 간격 × EF')`
//! 3. r < 3 (실패): 반복 횟수 0, 간격 1일 (EF'는 1번 규칙대로 낮아짐)
//! 4. 간격은 최대 `MAX_INTERVAL_DAYS`(약 100년)로 제한
//! 5. 다음 복습일 = 오늘 + 간격

use crate::error::AppError;
use crate::models::ReviewCard;
use chrono::{Days, NaiveDate};

/// 새 카드의 easiness factor
pub const INITIAL_EASINESS: f64 = 2.5;
/// easiness factor의 하한
pub const MIN_EASINESS: f64 = 1.3;
/// 성공으로 인정되는 최소 점수
pub const PASSING_RATING: u8 = 3;
/// 복습 간격의 상한 (일). 5점이 계속 이어져도 날짜 범위를 넘지 않습니다.
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// 0~5 범위가 보장된 기억 품질 점수
///
/// `Rating::new()`를 통해서만 만들 수 있으므로,
/// 스케줄러 안에서는 범위를 다시 확인할 필요가 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

impl Rating {
    /// 범위를 벗어나면 `rating` 필드에 대한 검증 에러를 반환합니다.
    pub fn new(value: i64) -> Result<Self, AppError> {
        if (0..=5).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(AppError::validation(
                "rating",
                format!("must be an integer between 0 and 5, got {}", value),
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// 3점 이상이면 성공 (경계값 3 포함)
    pub fn is_success(self) -> bool {
        self.0 >= PASSING_RATING
    }
}

/// 스케줄러가 다루는 카드 상태
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardState {
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub repetitions: i64,
}

impl Default for CardState {
    /// 막 만들어진 카드: EF 2.5, 간격 0, 반복 0
    fn default() -> Self {
        Self {
            easiness_factor: INITIAL_EASINESS,
            interval_days: 0,
            repetitions: 0,
        }
    }
}

impl From<&ReviewCard> for CardState {
    fn from(card: &ReviewCard) -> Self {
        Self {
            easiness_factor: card.easiness_factor,
            interval_days: card.interval_days,
            repetitions: card.repetitions,
        }
    }
}

impl CardState {
    /// 저장된 상태가 스케줄러가 만들어낼 수 있는 값인지 확인합니다.
    ///
    /// 정상적인 경로로는 절대 나올 수 없는 상태이므로 `Consistency` 에러를 반환합니다.
    pub fn check(&self) -> Result<(), AppError> {
        if !self.easiness_factor.is_finite() || self.easiness_factor < MIN_EASINESS {
            return Err(AppError::Consistency(format!(
                "easiness factor {} is below the {} floor",
                self.easiness_factor, MIN_EASINESS
            )));
        }
        if self.interval_days < 0 {
            return Err(AppError::Consistency(format!(
                "negative interval {}",
                self.interval_days
            )));
        }
        if self.repetitions < 0 {
            return Err(AppError::Consistency(format!(
                "negative repetition count {}",
                self.repetitions
            )));
        }
        // 한 번이라도 성공했다면 간격은 최소 1일입니다.
        if self.repetitions > 0 && self.interval_days < 1 {
            return Err(AppError::Consistency(format!(
                "{} repetitions with a {}-day interval",
                self.repetitions, self.interval_days
            )));
        }
        Ok(())
    }

    /// 상태 흐름에서 현재 단계
    pub fn phase(&self) -> Phase {
        match (self.repetitions, self.interval_days) {
            (0, 0) => Phase::New,
            (0, _) => Phase::Relearning,
            (1 | 2, _) => Phase::Learning,
            _ => Phase::Graduated,
        }
    }
}

/// 카드의 학습 단계 (로그용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 한 번도 복습하지 않음
    New,
    /// 실패 직후 (반복 횟수가 0으로 돌아감)
    Relearning,
    /// 1~2회 연속 성공 (간격 1일, 6일)
    Learning,
    /// 3회 이상 연속 성공 (간격 = 이전 간격 × EF)
    Graduated,
}

/// 한 번의 평가로 계산된 결과
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    pub state: CardState,
    pub next_review_date: NaiveDate,
}

/// 새 easiness factor를 계산합니다 (하한 1.3 적용).
pub fn next_easiness(easiness_factor: f64, rating: Rating) -> f64 {
    let miss = f64::from(5 - rating.value());
    let updated = easiness_factor + (0.1 - miss * (0.08 + miss * 0.02));
    updated.max(MIN_EASINESS)
}

/// 카드 상태에 평가를 적용해 다음 상태와 복습 날짜를 계산합니다.
///
/// # 매개변수
/// - `state`: 평가 전 카드 상태
/// - `rating`: 검증된 점수
/// - `today`: 평가한 날짜 (다음 복습일의 기준)
///
/// # 에러
/// - 입력 상태가 불가능한 값이면 `AppError::Consistency`
pub fn schedule(state: CardState, rating: Rating, today: NaiveDate) -> Result<Scheduled, AppError> {
    state.check()?;

    let easiness_factor = next_easiness(state.easiness_factor, rating);

    let (repetitions, interval_days) = if rating.is_success() {
        let repetitions = state.repetitions + 1;
        let interval_days = match repetitions {
            1 => 1,
            2 => 6,
            // 3회차부터는 이전 간격에 새 EF를 곱해 반올림합니다 (버림이 아님).
            _ => (state.interval_days as f64 * easiness_factor).round() as i64,
        };
        (repetitions, interval_days.min(MAX_INTERVAL_DAYS))
    } else {
        (0, 1)
    };

    let next_review_date = u64::try_from(interval_days)
        .ok()
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or_else(|| {
            AppError::Consistency(format!(
                "interval of {} days overflows the calendar",
                interval_days
            ))
        })?;

    Ok(Scheduled {
        state: CardState {
            easiness_factor,
            interval_days,
            repetitions,
        },
        next_review_date,
    })
}

/// 새 카드의 첫 복습일 (생성일 다음 날)
pub fn first_review_date(created_on: NaiveDate) -> NaiveDate {
    created_on
        .checked_add_days(Days::new(1))
        .unwrap_or(created_on)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rating(value: i64) -> Rating {
        Rating::new(value).unwrap()
    }

    fn state(easiness_factor: f64, interval_days: i64, repetitions: i64) -> CardState {
        CardState {
            easiness_factor,
            interval_days,
            repetitions,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn rating_bounds() {
        for value in 0..=5 {
            assert_eq!(rating(value).value() as i64, value);
        }
        for value in [-1, 6, 100, i64::MIN] {
            match Rating::new(value) {
                Err(AppError::Validation { field, .. }) => assert_eq!(field, "rating"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        assert!(rating(3).is_success());
        assert!(!rating(2).is_success());
    }

    #[test]
    fn easiness_update_per_rating() {
        let expected = [(5, 2.6), (4, 2.5), (3, 2.36), (2, 2.18), (1, 1.96), (0, 1.7)];
        for (r, ef) in expected {
            assert_close(next_easiness(INITIAL_EASINESS, rating(r)), ef);
        }
    }

    #[test]
    fn first_success_gives_one_day() {
        let today = day("2026-03-10");
        for r in 3..=5 {
            let out = schedule(CardState::default(), rating(r), today).unwrap();
            assert_eq!(out.state.repetitions, 1);
            assert_eq!(out.state.interval_days, 1);
            assert_eq!(out.next_review_date, day("2026-03-11"));
        }
    }

    #[test]
    fn second_success_gives_six_days() {
        for r in 3..=5 {
            let out = schedule(state(2.5, 1, 1), rating(r), day("2026-03-10")).unwrap();
            assert_eq!(out.state.repetitions, 2);
            assert_eq!(out.state.interval_days, 6);
            assert_eq!(out.next_review_date, day("2026-03-16"));
        }
    }

    #[test]
    fn later_successes_multiply_and_never_shrink() {
        for r in 3..=5 {
            for (ef, interval, reps) in [(2.5, 6, 2), (1.3, 1, 4), (1.3, 7, 3), (2.1, 40, 9)] {
                let out = schedule(state(ef, interval, reps), rating(r), day("2026-03-10")).unwrap();
                let new_ef = next_easiness(ef, rating(r));
                assert_eq!(out.state.repetitions, reps + 1);
                assert_eq!(
                    out.state.interval_days,
                    (interval as f64 * new_ef).round() as i64
                );
                assert!(out.state.interval_days >= interval);
            }
        }
    }

    #[test]
    fn interval_is_rounded_not_truncated() {
        // 6 × 2.6 = 15.6 → 16
        let out = schedule(state(2.5, 6, 2), rating(5), day("2026-03-10")).unwrap();
        assert_eq!(out.state.interval_days, 16);
        // 4 × 1.36 = 5.44 → 5
        let out = schedule(state(1.5, 4, 5), rating(3), day("2026-03-10")).unwrap();
        assert_eq!(out.state.interval_days, 5);
    }

    #[test]
    fn failures_reset_regardless_of_prior_state() {
        for r in 0..=2 {
            for prior in [CardState::default(), state(2.5, 6, 2), state(1.3, 300, 12)] {
                let out = schedule(prior, rating(r), day("2026-03-10")).unwrap();
                assert_eq!(out.state.repetitions, 0);
                assert_eq!(out.state.interval_days, 1);
                assert_eq!(out.next_review_date, day("2026-03-11"));
                assert!(out.state.easiness_factor < prior.easiness_factor || prior.easiness_factor == MIN_EASINESS);
            }
        }
    }

    #[test]
    fn easiness_never_drops_below_floor() {
        let mut current = CardState::default();
        for _ in 0..500 {
            current = schedule(current, rating(0), day("2026-03-10")).unwrap().state;
            assert!(current.easiness_factor >= MIN_EASINESS);
        }
        assert_close(current.easiness_factor, MIN_EASINESS);
    }

    #[test]
    fn scenario_graduated_card_rated_four() {
        let out = schedule(state(2.5, 6, 2), rating(4), day("2026-03-10")).unwrap();
        assert_close(out.state.easiness_factor, 2.5);
        assert_eq!(out.state.repetitions, 3);
        assert_eq!(out.state.interval_days, 15);
        assert_eq!(out.next_review_date, day("2026-03-25"));
    }

    #[test]
    fn scenario_blackout_then_repeated_blackouts() {
        let first = schedule(state(2.5, 15, 3), rating(0), day("2026-03-10")).unwrap();
        assert_close(first.state.easiness_factor, 1.7);
        assert_eq!(first.state.repetitions, 0);
        assert_eq!(first.state.interval_days, 1);

        let mut current = first.state;
        for _ in 0..4 {
            current = schedule(current, rating(0), day("2026-03-11")).unwrap().state;
            assert_eq!(current.interval_days, 1);
            assert_eq!(current.repetitions, 0);
        }
        assert_close(current.easiness_factor, MIN_EASINESS);
    }

    #[test]
    fn long_success_runs_cap_the_interval() {
        let mut current = CardState::default();
        for _ in 0..40 {
            let out = schedule(current, rating(5), day("2026-03-10")).unwrap();
            assert!(out.state.interval_days <= MAX_INTERVAL_DAYS);
            assert!(out.state.interval_days >= current.interval_days);
            current = out.state;
        }
        assert_eq!(current.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(current.repetitions, 40);

        let out = schedule(current, rating(4), day("2026-03-10")).unwrap();
        assert_eq!(out.state.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(out.next_review_date, day("2126-02-14"));
    }

    #[test]
    fn impossible_states_are_consistency_errors() {
        for bad in [
            state(1.0, 3, 2),
            state(f64::NAN, 3, 2),
            state(2.5, -4, 2),
            state(2.5, 3, -1),
            state(2.5, 0, 3),
        ] {
            assert!(matches!(
                schedule(bad, rating(4), day("2026-03-10")),
                Err(AppError::Consistency(_))
            ));
        }
    }

    #[test]
    fn phases_follow_state_machine() {
        assert_eq!(CardState::default().phase(), Phase::New);
        assert_eq!(state(2.5, 1, 1).phase(), Phase::Learning);
        assert_eq!(state(2.5, 6, 2).phase(), Phase::Learning);
        assert_eq!(state(2.5, 15, 3).phase(), Phase::Graduated);
        assert_eq!(state(1.7, 1, 0).phase(), Phase::Relearning);
    }

    #[test]
    fn first_review_is_next_day() {
        assert_eq!(first_review_date(day("2026-12-31")), day("2027-01-01"));
    }
}
