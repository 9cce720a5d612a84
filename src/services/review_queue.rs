//! # 복습 큐 서비스
//!
//! 오늘 복습할 하이라이트 목록, 평가 제출, 복습 통계를 제공합니다.
//! 서비스 자체는 상태를 갖지 않으며, 모든 상태는 `review_cards` 행에 있습니다.
//! 통계도 캐시 없이 요청마다 계산합니다.
//!
//! ## 평가 제출 흐름
//! ```text
//! 점수 검증 (실패 시 DB를 건드리지 않음)
//! BEGIN
//!   카드 조회 → 없음: 하이라이트 유무에 따라 NotFound / ReviewCardMissing
//!            → 비활성: NotFound
//!   스케줄 계산 → 상태가 깨져 있으면 카드 동결 후 COMMIT, Consistency 에러
//!   UPDATE ... WHERE revision = ?  → 0행이면 Transient (재시도 가능)
//!   review_events INSERT
//! COMMIT
//! ```

use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::scheduler::{self, CardState, Rating};
use chrono::{Datelike, Days, NaiveDate};
use sqlx::SqlitePool;

/// 한 번에 돌려주는 복습 카드 수의 상한
pub const MAX_DUE_LIMIT: u32 = 100;

/// "이번 주 예정" 통계에 포함하는 기간 (오늘 + 7일까지)
const UPCOMING_DAYS: u64 = 7;

/// 오늘까지 복습 날짜가 된 활성 카드를 하이라이트와 함께 돌려줍니다.
///
/// - `limit`은 100으로 제한되며, 0이면 빈 목록입니다.
/// - 정렬이 결정적이므로, 그 사이 제출이 없다면 몇 번을 호출해도 같은 결과입니다.
pub async fn get_due_reviews(
    pool: &SqlitePool,
    today: NaiveDate,
    limit: u32,
) -> Result<Vec<DueReview>, AppError> {
    let limit = limit.min(MAX_DUE_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut conn = pool.acquire().await?;
    let cards = db::list_due_cards(&mut conn, today, i64::from(limit)).await?;

    let ids: Vec<String> = cards.iter().map(|card| card.highlight_id.clone()).collect();
    let mut rows = db::due_highlight_rows(&mut conn, &ids).await?;
    let mut tags = db::tags_for_highlights(&mut conn, &ids).await?;

    let mut due = Vec::with_capacity(cards.len());
    for card in cards {
        let Some(row) = rows.remove(&card.highlight_id) else {
            tracing::warn!(highlight_id = %card.highlight_id, "Due card without a highlight");
            continue;
        };
        let highlight_tags = tags.remove(&card.highlight_id).unwrap_or_default();
        due.push(DueReview {
            highlight: row.highlight.into_highlight(highlight_tags),
            source_title: row.source_title,
            source_type: row.source_type,
            card,
        });
    }

    Ok(due)
}

/// 하이라이트에 대한 평가를 적용하고 새 스케줄을 돌려줍니다.
///
/// # 에러
/// - `Validation`: 점수가 0~5 밖 (카드는 그대로)
/// - `NotFound`: 하이라이트가 없거나 카드가 비활성
/// - `ReviewCardMissing`: 하이라이트는 있는데 카드가 없음
/// - `Consistency`: 저장된 카드 상태가 불가능한 값 (카드는 동결됨)
/// - `Transient`: 동시에 다른 제출이 카드를 바꿈
pub async fn submit_review(
    pool: &SqlitePool,
    highlight_id: &str,
    rating: i64,
    today: NaiveDate,
) -> Result<ReviewOutcome, AppError> {
    let rating = Rating::new(rating)?;

    let mut tx = pool.begin().await?;

    let Some(card) = db::get_review_card(&mut tx, highlight_id).await? else {
        if db::highlight_exists(&mut tx, highlight_id).await? {
            return Err(AppError::ReviewCardMissing(highlight_id.to_string()));
        }
        return Err(AppError::not_found("Highlight not found"));
    };
    if !card.is_active {
        return Err(AppError::not_found("Review card is inactive"));
    }

    let previous = CardState::from(&card);
    let scheduled = match scheduler::schedule(previous, rating, today) {
        Ok(scheduled) => scheduled,
        Err(e @ AppError::Consistency(_)) => {
            // 동결은 에러를 돌려주기 전에 커밋해서 남깁니다.
            db::freeze_card(&mut tx, highlight_id).await?;
            tx.commit().await?;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if !db::update_card_state(&mut tx, highlight_id, card.revision, &scheduled).await? {
        return Err(AppError::Transient(format!(
            "review card {} was updated concurrently",
            highlight_id
        )));
    }
    db::insert_review_event(&mut tx, highlight_id, rating, &previous, &scheduled, today).await?;

    tx.commit().await?;

    tracing::info!(
        highlight_id = %highlight_id,
        rating = rating.value(),
        interval_days = scheduled.state.interval_days,
        phase = ?scheduled.state.phase(),
        "Review submitted"
    );

    Ok(ReviewOutcome {
        highlight_id: highlight_id.to_string(),
        rating: rating.value(),
        easiness_factor: scheduled.state.easiness_factor,
        interval_days: scheduled.state.interval_days,
        repetitions: scheduled.state.repetitions,
        next_review_date: db::date_key(scheduled.next_review_date),
    })
}

/// 카드 상태와 복습 기록(최신순)
pub async fn get_review_card(
    pool: &SqlitePool,
    highlight_id: &str,
) -> Result<ReviewCardDetail, AppError> {
    let mut conn = pool.acquire().await?;
    let card = require_card(&mut conn, highlight_id).await?;
    let history = db::list_review_events(&mut conn, highlight_id).await?;

    Ok(ReviewCardDetail { card, history })
}

/// 카드를 수동으로 활성/비활성화합니다.
///
/// 비활성 카드는 복습 목록에 나오지 않고 평가도 받지 않습니다.
/// 다시 활성화하면 저장된 스케줄 그대로 이어집니다.
pub async fn set_review_active(
    pool: &SqlitePool,
    highlight_id: &str,
    is_active: bool,
) -> Result<ReviewCard, AppError> {
    let mut tx = pool.begin().await?;
    require_card(&mut tx, highlight_id).await?;
    db::set_card_active(&mut tx, highlight_id, is_active).await?;
    let card = require_card(&mut tx, highlight_id).await?;
    tx.commit().await?;

    tracing::info!(highlight_id = %highlight_id, is_active, "Review card activation changed");
    Ok(card)
}

async fn require_card(
    conn: &mut sqlx::SqliteConnection,
    highlight_id: &str,
) -> Result<ReviewCard, AppError> {
    if let Some(card) = db::get_review_card(&mut *conn, highlight_id).await? {
        return Ok(card);
    }
    if db::highlight_exists(&mut *conn, highlight_id).await? {
        Err(AppError::ReviewCardMissing(highlight_id.to_string()))
    } else {
        Err(AppError::not_found("Highlight not found"))
    }
}

/// 복습 통계를 계산합니다.
///
/// - 이번 주: 월요일부터 오늘까지
/// - 이번 달: 1일부터 오늘까지
/// - 평균 EF: 활성 카드 기준, 소수점 둘째 자리 반올림
pub async fn get_review_stats(pool: &SqlitePool, today: NaiveDate) -> Result<ReviewStats, AppError> {
    let upcoming = today
        .checked_add_days(Days::new(UPCOMING_DAYS))
        .unwrap_or(today);

    // 읽기 트랜잭션: 모든 숫자가 같은 시점의 스냅샷에서 나옵니다.
    let mut tx = pool.begin().await?;

    let due_today = db::count_due_until(&mut tx, today).await?;
    let due_this_week = db::count_due_until(&mut tx, upcoming).await?;
    let reviewed_today = db::count_reviews_between(&mut tx, today, today).await?;
    let reviewed_this_week = db::count_reviews_between(&mut tx, week_start(today), today).await?;
    let reviewed_this_month = db::count_reviews_between(&mut tx, month_start(today), today).await?;
    let (total_highlights_with_reviews, average) = db::active_card_summary(&mut tx).await?;
    let days = db::review_days(&mut tx, today).await?;

    tx.commit().await?;

    Ok(ReviewStats {
        due_today,
        due_this_week,
        reviewed_today,
        reviewed_this_week,
        reviewed_this_month,
        total_highlights_with_reviews,
        average_easiness_factor: (average * 100.0).round() / 100.0,
        current_streak: current_streak(&days, today),
    })
}

/// 오늘부터 거꾸로 하루도 빠짐없이 복습한 날 수
///
/// `days`는 중복 없는 최신순 날짜입니다.
/// 오늘 아직 복습하지 않았다면 어제부터 셉니다 (오늘이 끝나기 전까지는 연속 기록이 유지됨).
pub fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let Some(&latest) = days.first() else {
        return 0;
    };

    let yesterday = today.pred_opt().unwrap_or(today);
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 0;
    let mut expected = latest;
    for &day in days {
        if day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(previous) => expected = previous,
            None => break,
        }
    }
    streak
}

/// 이번 주 월요일
pub fn week_start(today: NaiveDate) -> NaiveDate {
    let offset = u64::from(today.weekday().num_days_from_monday());
    today.checked_sub_days(Days::new(offset)).unwrap_or(today)
}

/// 이번 달 1일
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::*;

    async fn card_of(pool: &SqlitePool, highlight_id: &str) -> ReviewCard {
        get_review_card(pool, highlight_id).await.unwrap().card
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[tokio::test]
    async fn full_review_lifecycle() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Deep Work").await;
        let created = day("2026-03-01");
        let highlight = new_highlight(&pool, &source.id, "Clarity about what matters", created).await;

        // 새 카드: EF 2.5, 간격 0, 반복 0, 다음 날 복습
        let card = card_of(&pool, &highlight.id).await;
        assert_close(card.easiness_factor, 2.5);
        assert_eq!((card.interval_days, card.repetitions), (0, 0));
        assert_eq!(card.next_review_date, "2026-03-02");

        let first = submit_review(&pool, &highlight.id, 4, day("2026-03-02")).await.unwrap();
        assert_eq!((first.repetitions, first.interval_days), (1, 1));
        let second = submit_review(&pool, &highlight.id, 4, day("2026-03-03")).await.unwrap();
        assert_eq!((second.repetitions, second.interval_days), (2, 6));
        assert_eq!(second.next_review_date, "2026-03-09");

        // {2.5, 6, 2} + 4 → EF 2.5, 반복 3, 간격 15
        let third = submit_review(&pool, &highlight.id, 4, day("2026-03-09")).await.unwrap();
        assert_close(third.easiness_factor, 2.5);
        assert_eq!((third.repetitions, third.interval_days), (3, 15));
        assert_eq!(third.next_review_date, "2026-03-24");

        // {2.5, 15, 3} + 0 → EF 1.7, 반복 0, 간격 1
        let lapse = submit_review(&pool, &highlight.id, 0, day("2026-03-24")).await.unwrap();
        assert_close(lapse.easiness_factor, 1.7);
        assert_eq!((lapse.repetitions, lapse.interval_days), (0, 1));

        // 네 번 더 0점 → EF는 1.3에서 멈춤
        let mut last = lapse;
        for offset in 1..=4u64 {
            let on = day("2026-03-24").checked_add_days(Days::new(offset)).unwrap();
            last = submit_review(&pool, &highlight.id, 0, on).await.unwrap();
            assert_eq!(last.interval_days, 1);
            assert!(last.easiness_factor >= scheduler::MIN_EASINESS);
        }
        assert_close(last.easiness_factor, scheduler::MIN_EASINESS);

        let detail = get_review_card(&pool, &highlight.id).await.unwrap();
        assert_eq!(detail.history.len(), 8);
        assert_eq!(detail.history[0].rating, 0);
        assert_eq!(detail.history.last().unwrap().rating, 4);
        assert_close(detail.history[4].previous_easiness, 2.5);
    }

    #[tokio::test]
    async fn out_of_range_rating_changes_nothing() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Book").await;
        let highlight = new_highlight(&pool, &source.id, "Stable", day("2026-03-01")).await;
        let before = card_of(&pool, &highlight.id).await;

        for bad in [-1, 6, 42] {
            match submit_review(&pool, &highlight.id, bad, day("2026-03-02")).await {
                Err(AppError::Validation { field, .. }) => assert_eq!(field, "rating"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }

        assert_eq!(card_of(&pool, &highlight.id).await, before);
        assert!(get_review_card(&pool, &highlight.id).await.unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn due_list_is_filtered_ordered_and_repeatable() {
        let pool = test_pool().await;
        let book = new_source(&pool, "Book").await;
        let older = new_highlight(&pool, &book.id, "older", day("2026-03-01")).await;
        let newer = new_highlight(&pool, &book.id, "newer", day("2026-03-05")).await;
        let paused = new_highlight(&pool, &book.id, "paused", day("2026-03-01")).await;
        new_highlight(&pool, &book.id, "tomorrow", day("2026-03-10")).await;
        set_review_active(&pool, &paused.id, false).await.unwrap();

        let today = day("2026-03-10");
        let first = get_due_reviews(&pool, today, 20).await.unwrap();
        let ids: Vec<&str> = first.iter().map(|d| d.highlight.id.as_str()).collect();
        assert_eq!(ids, vec![older.id.as_str(), newer.id.as_str()]);
        assert_eq!(first[0].source_title, "Book");
        assert_eq!(first[0].source_type, SourceType::Book);

        let second = get_due_reviews(&pool, today, 20).await.unwrap();
        let again: Vec<&str> = second.iter().map(|d| d.highlight.id.as_str()).collect();
        assert_eq!(ids, again);

        assert_eq!(get_due_reviews(&pool, today, 1).await.unwrap().len(), 1);
        assert!(get_due_reviews(&pool, today, 0).await.unwrap().is_empty());

        // 평가하면 미래로 밀려나 목록에서 빠집니다.
        submit_review(&pool, &older.id, 5, today).await.unwrap();
        let after = get_due_reviews(&pool, today, 20).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].highlight.id, newer.id);
    }

    #[tokio::test]
    async fn empty_store_has_nothing_due() {
        let pool = test_pool().await;
        assert!(get_due_reviews(&pool, day("2026-03-10"), 20).await.unwrap().is_empty());
        assert_eq!(
            get_review_stats(&pool, day("2026-03-10")).await.unwrap(),
            ReviewStats::default()
        );
    }

    #[tokio::test]
    async fn inactive_card_rejects_submission_until_reactivated() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Book").await;
        let highlight = new_highlight(&pool, &source.id, "Paused", day("2026-03-01")).await;

        let card = set_review_active(&pool, &highlight.id, false).await.unwrap();
        assert!(!card.is_active);
        assert!(matches!(
            submit_review(&pool, &highlight.id, 4, day("2026-03-02")).await,
            Err(AppError::NotFound(_))
        ));

        set_review_active(&pool, &highlight.id, true).await.unwrap();
        assert!(submit_review(&pool, &highlight.id, 4, day("2026-03-02")).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_highlight_and_missing_card_are_distinct() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Book").await;
        let highlight = new_highlight(&pool, &source.id, "Orphaned", day("2026-03-01")).await;

        match submit_review(&pool, "nope", 4, day("2026-03-02")).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "Highlight not found"),
            other => panic!("expected not found, got {other:?}"),
        }

        sqlx::query("DELETE FROM review_cards WHERE highlight_id = ?")
            .bind(&highlight.id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(matches!(
            submit_review(&pool, &highlight.id, 4, day("2026-03-02")).await,
            Err(AppError::ReviewCardMissing(_))
        ));
    }

    #[tokio::test]
    async fn corrupted_card_is_frozen() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Book").await;
        let highlight = new_highlight(&pool, &source.id, "Broken", day("2026-03-01")).await;

        sqlx::query("UPDATE review_cards SET interval_days = -3, repetitions = 2 WHERE highlight_id = ?")
            .bind(&highlight.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            submit_review(&pool, &highlight.id, 4, day("2026-03-02")).await,
            Err(AppError::Consistency(_))
        ));

        let card = card_of(&pool, &highlight.id).await;
        assert!(!card.is_active);
        assert_eq!(card.interval_days, -3);
        assert!(get_due_reviews(&pool, day("2026-03-10"), 20).await.unwrap().is_empty());
        assert!(matches!(
            submit_review(&pool, &highlight.id, 4, day("2026-03-02")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn long_run_of_perfect_ratings_keeps_card_active() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Book").await;
        let highlight = new_highlight(&pool, &source.id, "Well known", day("2026-03-01")).await;

        // 같은 날 5점을 계속 제출해도 간격만 상한에 머무르고 카드는 살아 있습니다.
        let today = day("2026-03-02");
        let mut last = None;
        for _ in 0..30 {
            last = Some(submit_review(&pool, &highlight.id, 5, today).await.unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.repetitions, 30);
        assert_eq!(last.interval_days, scheduler::MAX_INTERVAL_DAYS);
        assert_eq!(last.next_review_date, "2126-02-06");

        let card = card_of(&pool, &highlight.id).await;
        assert!(card.is_active);
        assert_eq!(card.interval_days, scheduler::MAX_INTERVAL_DAYS);
    }

    #[tokio::test]
    async fn stats_count_windows_and_streak() {
        let pool = test_pool().await;
        let source = new_source(&pool, "Book").await;
        let a = new_highlight(&pool, &source.id, "a", day("2026-02-20")).await;
        let b = new_highlight(&pool, &source.id, "b", day("2026-02-20")).await;
        let c = new_highlight(&pool, &source.id, "c", day("2026-03-11")).await;

        // 2026-03-12는 목요일. 이번 주는 03-09(월)부터, 이번 달은 03-01부터
        let today = day("2026-03-12");
        submit_review(&pool, &a.id, 5, day("2026-02-28")).await.unwrap();
        submit_review(&pool, &b.id, 2, day("2026-03-02")).await.unwrap();
        submit_review(&pool, &b.id, 4, day("2026-03-10")).await.unwrap();
        submit_review(&pool, &a.id, 3, day("2026-03-11")).await.unwrap();
        submit_review(&pool, &c.id, 1, today).await.unwrap();

        let stats = get_review_stats(&pool, today).await.unwrap();
        assert_eq!(stats.reviewed_today, 1);
        assert_eq!(stats.reviewed_this_week, 3);
        assert_eq!(stats.reviewed_this_month, 4);
        assert_eq!(stats.total_highlights_with_reviews, 3);
        assert_eq!(stats.current_streak, 3);
        // a: 2.6 → 2.46, b: 2.18 → 2.18, c: 1.96
        assert_close(stats.average_easiness_factor, 2.2);
        // b와 c는 간격 1일 → 03-11, 03-13 / a는 2회차 → 6일 뒤(03-17)
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.due_this_week, 3);
    }

    #[test]
    fn streak_walks_back_from_today() {
        let today = day("2026-03-12");
        let days = |list: &[&str]| list.iter().map(|d| day(d)).collect::<Vec<_>>();

        assert_eq!(current_streak(&[], today), 0);
        assert_eq!(current_streak(&days(&["2026-03-12"]), today), 1);
        assert_eq!(
            current_streak(&days(&["2026-03-12", "2026-03-11", "2026-03-10", "2026-03-08"]), today),
            3
        );
        // 오늘 아직 복습하지 않아도 어제까지의 기록은 유지
        assert_eq!(current_streak(&days(&["2026-03-11", "2026-03-10"]), today), 2);
        assert_eq!(current_streak(&days(&["2026-03-10", "2026-03-09"]), today), 0);
    }

    #[test]
    fn calendar_windows() {
        assert_eq!(week_start(day("2026-03-12")), day("2026-03-09"));
        assert_eq!(week_start(day("2026-03-09")), day("2026-03-09"));
        assert_eq!(week_start(day("2026-03-01")), day("2026-02-23"));
        assert_eq!(month_start(day("2026-03-12")), day("2026-03-01"));
    }
}
