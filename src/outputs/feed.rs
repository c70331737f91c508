//! RSS 2.0 feed of the latest report.

use crate::error::RenderError;
use crate::models::Report;
use crate::utils::truncate_chars;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{self, Write};

const CHANNEL_TITLE: &str = "Tech News Digest";
const CHANNEL_DESCRIPTION: &str = "Daily technology news, categorized and scored.";
const ITEM_DESCRIPTION_CHARS: usize = 300;

/// Drop the control characters XML 1.0 forbids; tab, LF and CR stay.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || u32::from(c) >= 0x20)
        .collect()
}

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Render `report` as an RSS 2.0 document.
///
/// `site_url` is the public base URL of the published output; when set the
/// channel links to it, otherwise the channel link is left empty.
pub fn render_rss(report: &Report, site_url: Option<&str>) -> Result<String, RenderError> {
    build_rss(report, site_url).map_err(RenderError::Feed)
}

fn build_rss(report: &Report, site_url: Option<&str>) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    let channel_link = site_url
        .map(|u| format!("{}/", u.trim_end_matches('/')))
        .unwrap_or_default();
    write_text_element(&mut writer, "title", CHANNEL_TITLE)?;
    write_text_element(&mut writer, "link", &channel_link)?;
    write_text_element(&mut writer, "description", CHANNEL_DESCRIPTION)?;
    write_text_element(&mut writer, "lastBuildDate", &report.generated_at.to_rfc2822())?;

    for article in &report.articles {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &article.title)?;
        write_text_element(&mut writer, "link", &article.link)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&xml_safe(&article.link))))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        write_text_element(&mut writer, "pubDate", &article.published_at.to_rfc2822())?;
        write_text_element(&mut writer, "category", article.category_label())?;

        let description = article
            .ai_summary
            .clone()
            .unwrap_or_else(|| truncate_chars(&article.raw_summary, ITEM_DESCRIPTION_CHARS));
        write_text_element(&mut writer, "description", &description)?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::article;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_rss_is_parseable_and_ordered() {
        let mut first = article("https://example.com/b", 9);
        first.title = "Chips & <Tools>".to_string();
        first.ai_summary = Some("A summary".to_string());
        let second = article("https://example.com/a", 4);
        let report = Report::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(),
            vec![first, second],
        );

        let xml = render_rss(&report, Some("https://news.example.org/")).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("Chips &amp; &lt;Tools&gt;"));
        assert!(xml.contains("<link>https://news.example.org/</link>"));

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.entries[0].links[0].href, "https://example.com/b");
        assert_eq!(
            feed.entries[0].title.as_ref().map(|t| t.content.as_str()),
            Some("Chips & <Tools>")
        );
    }

    #[test]
    fn test_rss_strips_control_characters() {
        let mut a = article("https://example.com/c", 9);
        a.title = crate::utils::html_to_text("Bad&#x1;title");
        a.ai_summary = Some("line one\nline\u{8} two".to_string());
        let report = Report::new(Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(), vec![a]);

        let xml = render_rss(&report, None).unwrap();
        assert!(!xml.chars().any(|c| u32::from(c) < 0x20 && !matches!(c, '\t' | '\n' | '\r')));
        assert!(xml.contains("<title>Badtitle</title>"));
        assert!(xml.contains("line one\nline two"));
        assert!(feed_rs::parser::parse(xml.as_bytes()).is_ok());
    }

    #[test]
    fn test_xml_safe_keeps_whitespace_controls() {
        assert_eq!(xml_safe("a\tb\r\nc\u{0}\u{1f}d"), "a\tb\r\ncd");
        assert_eq!(xml_safe("日本語 ok"), "日本語 ok");
    }

    #[test]
    fn test_rss_without_site_url() {
        let report = Report::new(Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(), vec![]);
        let xml = render_rss(&report, None).unwrap();
        assert!(xml.contains("<title>Tech News Digest</title>"));
        assert!(!xml.contains("<item>"));
    }
}
