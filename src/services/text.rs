//! # 텍스트 유틸리티
//!
//! 읽을거리 본문에서 메타데이터를 계산하는 함수들입니다.
//!
//! - `count_words()`: 텍스트의 단어 수 계산
//! - `reading_time_minutes()`: 단어 수로부터 예상 읽기 시간 계산
//! - `domain_from_url()`: URL에서 도메인 추출
//! - `clean_optional()`: 공백뿐인 선택 입력을 None으로 정리

use url::Url;

/// 분당 읽는 단어 수 (예상 읽기 시간 계산 기준)
pub const WORDS_PER_MINUTE: usize = 200;

/// 텍스트의 단어 수를 계산합니다.
///
/// 공백(스페이스, 탭, 줄바꿈)으로 분리하여 단어를 셉니다.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 예상 읽기 시간(분)을 계산합니다. 단어가 하나라도 있으면 최소 1분입니다.
pub fn reading_time_minutes(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_MINUTE)
}

/// URL에서 도메인(호스트)을 추출합니다.
///
/// 예: `"https://www.Example.com/post/1?x=y"` → `Some("example.com")`
///
/// WHATWG 규칙으로 파싱하는 `url` 크레이트를 사용합니다.
/// 스킴이 없으면(`example.org/a`) `https://`를 붙여 한 번 더 시도합니다.
/// 호스트가 없으면 None을 반환합니다.
pub fn domain_from_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", raw)).ok()?
        }
        Err(_) => return None,
    };

    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// 앞뒤 공백을 제거하고, 비어 있으면 None으로 바꿉니다.
pub fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_whitespace() {
        assert_eq!(count_words("  one two\tthree\nfour  "), 4);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time_minutes(0), 0);
        assert_eq!(reading_time_minutes(1), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
    }

    #[test]
    fn extracts_domain() {
        assert_eq!(
            domain_from_url("https://www.Example.com/post/1?x=y").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            domain_from_url("http://user:pw@blog.rust-lang.org:8080/x").as_deref(),
            Some("blog.rust-lang.org")
        );
        assert_eq!(domain_from_url("example.org/a").as_deref(), Some("example.org"));
        assert_eq!(domain_from_url("mailto:someone@example.com"), None);
        assert_eq!(domain_from_url("not a url"), None);
    }

    #[test]
    fn domain_follows_whatwg_parsing() {
        assert_eq!(domain_from_url("http://[::1]:8080/a").as_deref(), Some("[::1]"));
        // 특수 스킴에서 `\`는 `/`와 같으므로 `@` 뒤가 아니라 앞이 호스트입니다.
        assert_eq!(
            domain_from_url("https://evil.com\\@good.com/").as_deref(),
            Some("evil.com")
        );
        assert_eq!(domain_from_url("https://WWW.Rust-Lang.org").as_deref(), Some("rust-lang.org"));
    }

    #[test]
    fn blank_optional_becomes_none() {
        assert_eq!(clean_optional(Some("  ")), None);
        assert_eq!(clean_optional(Some(" note ")).as_deref(), Some("note"));
        assert_eq!(clean_optional(None), None);
    }
}
