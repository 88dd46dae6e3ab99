// Extraction of catalog pages and iCalendar feeds.
//
// The catalog serves server-rendered Russian-language HTML; we pull out the
// handful of fields we need with anchored captures rather than a full DOM
// parse. Schedule instants come from the per-event iCalendar feed, not from
// the page.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use questline_core::{EventDetail, QuestlineError, Result, RoughEvent};
use regex::Regex;

/// Floating (zone-less) iCal instants are event-local; the catalog's events
/// all live in the same fixed zone, UTC+3.
const EVENT_ZONE_OFFSET_HOURS: i64 = 3;

pub struct CatalogPatterns {
    announcement: Regex,
    detail_title: Regex,
    detail_description: Regex,
    detail_meta: Regex,
    tag: Regex,
}

impl CatalogPatterns {
    pub fn new() -> Self {
        Self {
            // One announcement block: date heading, then the titled link
            // whose href carries the event id.
            announcement: Regex::new(
                r#"(?s)b-events__title.*?class="title"[^>]*>([^<]+)<.*?b-events__body_title.*?href="([^"]+?)"[^>]*>\s*([^<]+?)\s*<"#,
            )
            .expect("announcement pattern"),
            detail_title: Regex::new(r#"class="post_single"[^>]*>\s*([^<]+?)\s*<"#)
                .expect("detail title pattern"),
            detail_description: Regex::new(r#"(?s)class="post__text"[^>]*>(.*?)</div>"#)
                .expect("detail description pattern"),
            detail_meta: Regex::new(
                r#"(?s)class="articleMetaItem__content"[^>]*>\s*([^<]+?)\s*<"#,
            )
            .expect("detail meta pattern"),
            tag: Regex::new(r"<[^>]+>").expect("tag pattern"),
        }
    }

    /// Parse the announcement list page into rough events, newest layout
    /// first. Blocks whose date cannot be read are skipped, not fatal: one
    /// odd block must not hide the rest of the catalog.
    pub fn parse_announcements(&self, html: &str) -> Vec<RoughEvent> {
        let mut events = Vec::new();
        for caps in self.announcement.captures_iter(html) {
            let date_text = caps[1].trim();
            let href = caps[2].trim();
            let title = caps[3].trim();

            let Some(id) = event_id_from_href(href) else {
                continue;
            };
            let Some(date) = parse_announcement_date(date_text) else {
                tracing::debug!(date_text, "skipping announcement with unreadable date");
                continue;
            };
            events.push(RoughEvent {
                id,
                title: title.to_string(),
                date,
            });
        }
        events
    }

    /// Parse one event page plus its iCal feed into full detail
    pub fn parse_detail(&self, event_id: &str, html: &str, ics: &str) -> Result<EventDetail> {
        let title = self
            .detail_title
            .captures(html)
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| QuestlineError::source("event page has no title"))?;

        let description_html = self
            .detail_description
            .captures(html)
            .map(|c| c[1].to_string())
            .ok_or_else(|| QuestlineError::source("event page has no description"))?;
        let description = self
            .strip_tags(&description_html)
            .replace("Добавить в календарь", "")
            .trim()
            .to_string();

        // The second meta item holds the venue address.
        let address = self
            .detail_meta
            .captures_iter(html)
            .nth(1)
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| QuestlineError::source("event page has no address"))?;

        let start_at = ical_instant(ics, "DTSTART")?;
        let end_at = ical_instant(ics, "DTEND")?;

        Ok(EventDetail {
            id: event_id.to_string(),
            title,
            description,
            address,
            start_at,
            end_at,
        })
    }

    fn strip_tags(&self, html: &str) -> String {
        let text = self.tag.replace_all(html, " ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn event_id_from_href(href: &str) -> Option<String> {
    let file = href.rsplit('/').next()?;
    let id = file.strip_suffix(".html").unwrap_or(file);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Announcement dates come either numeric ("01.03.2025") or spelled out in
/// Russian ("1 марта 2025"), possibly prefixed with a weekday and trailed
/// by a time; only the leading date segment matters.
fn parse_announcement_date(text: &str) -> Option<NaiveDate> {
    let head = text.split(',').next()?.trim();
    let head = match head.chars().next() {
        // "суббота, 1 марта 2025": drop the weekday prefix
        Some(c) if c.is_alphabetic() => text.splitn(2, ',').nth(1)?.split(',').next()?.trim(),
        _ => head,
    };

    if let Ok(date) = NaiveDate::parse_from_str(head, "%d.%m.%Y") {
        return Some(date);
    }

    let mut parts = head.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = russian_month(parts.next()?)?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn russian_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "января" => 1,
        "февраля" => 2,
        "марта" => 3,
        "апреля" => 4,
        "мая" => 5,
        "июня" => 6,
        "июля" => 7,
        "августа" => 8,
        "сентября" => 9,
        "октября" => 10,
        "ноября" => 11,
        "декабря" => 12,
        _ => return None,
    };
    Some(month)
}

/// Read one instant property (`DTSTART`/`DTEND`) from an iCal feed.
/// Accepts UTC instants (`...Z`) and floating/TZID-qualified event-local
/// instants.
fn ical_instant(ics: &str, property: &str) -> Result<DateTime<Utc>> {
    let line = ics
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(property))
        .ok_or_else(|| QuestlineError::source(format!("iCal feed has no {property}")))?;

    let value = line
        .rsplit(':')
        .next()
        .ok_or_else(|| QuestlineError::source(format!("unreadable {property} line")))?
        .trim();

    if let Some(utc_value) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc_value, "%Y%m%dT%H%M%S")
            .map_err(|_| QuestlineError::source(format!("unreadable {property} instant")))?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|_| QuestlineError::source(format!("unreadable {property} instant")))?;
    Ok(Utc.from_utc_datetime(&naive) - Duration::hours(EVENT_ZONE_OFFSET_HOURS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LIST_FIXTURE: &str = r#"
    <div class="b-events">
      <div class="b-events__title"><span class="title">01.03.2025</span></div>
      <div class="b-events__body_title"><a href="/announcements/986754320.html">Open Lab Night</a></div>
    </div>
    <div class="b-events">
      <div class="b-events__title"><span class="title">суббота, 8 марта 2025</span></div>
      <div class="b-events__body_title"><a href="/announcements/986754321.html">Campus Hackathon</a></div>
    </div>
    "#;

    const DETAIL_FIXTURE: &str = r#"
    <div class="post">
      <h1 class="post_single">Open Lab Night</h1>
      <div class="articleMetaItem"><div class="articleMetaItem__content">1 March</div></div>
      <div class="articleMetaItem"><div class="articleMetaItem__content">Main building, room 205</div></div>
      <div class="post__text"><p>Tour the lab and meet the team.</p><a>Добавить в календарь</a></div>
    </div>
    "#;

    const ICS_FIXTURE: &str = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:20250301T130000Z\nDTEND;TZID=Europe/Moscow:20250301T190000\nEND:VEVENT\nEND:VCALENDAR\n";

    #[test]
    fn announcement_list_yields_ids_titles_and_dates() {
        let patterns = CatalogPatterns::new();
        let events = patterns.parse_announcements(LIST_FIXTURE);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].id, "986754320");
        assert_eq!(events[0].title, "Open Lab Night");
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        assert_eq!(events[1].id, "986754321");
        assert_eq!(events[1].title, "Campus Hackathon");
        assert_eq!(events[1].date, NaiveDate::from_ymd_opt(2025, 3, 8).unwrap());
    }

    #[test]
    fn unreadable_blocks_are_skipped_not_fatal() {
        let patterns = CatalogPatterns::new();
        let html = r#"
        <div class="b-events">
          <div class="b-events__title"><span class="title">скоро</span></div>
          <div class="b-events__body_title"><a href="/announcements/1.html">Mystery</a></div>
        </div>
        "#;
        assert!(patterns.parse_announcements(html).is_empty());
    }

    #[test]
    fn detail_page_parses_with_ical_window() {
        let patterns = CatalogPatterns::new();
        let detail = patterns
            .parse_detail("986754320", DETAIL_FIXTURE, ICS_FIXTURE)
            .unwrap();

        assert_eq!(detail.title, "Open Lab Night");
        assert_eq!(detail.description, "Tour the lab and meet the team.");
        assert_eq!(detail.address, "Main building, room 205");
        // DTSTART is an explicit UTC instant
        assert_eq!(
            detail.start_at,
            Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap()
        );
        // DTEND is event-local (UTC+3), normalized to UTC
        assert_eq!(
            detail.end_at,
            Utc.with_ymd_and_hms(2025, 3, 1, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_schedule_is_source_unavailable() {
        let patterns = CatalogPatterns::new();
        let err = patterns
            .parse_detail("986754320", DETAIL_FIXTURE, "BEGIN:VCALENDAR\nEND:VCALENDAR\n")
            .unwrap_err();
        assert!(matches!(err, QuestlineError::SourceUnavailable(_)));
    }
}
