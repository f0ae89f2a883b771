//! Table extraction for heavens-above.com pages.
//!
//! The pages are not well-formed enough for a strict parser, so rows and cells
//! are located by case-insensitive tag scanning and read as plain text.

use crate::domain::{EventRow, IridiumFlareRow, IssPassRow, PassPoint, PlanetPositionRow, RowDate};
use crate::errors::FetchError;
use crate::utils::{cell_text, degree_markup};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Marker class on the data rows of the pass tables
const ROW_CLASS: &str = "clickablerow";

const ISS_COLUMNS: usize = 12;
const IRIDIUM_COLUMNS: usize = 8;

/// One element's opening tag and its content, up to the matching close or the
/// next sibling opening, whichever comes first.
struct Element<'a> {
    offset: usize,
    open_tag: &'a str,
    inner: &'a str,
}

fn find_open(lower: &str, from: usize, tags: &[&str]) -> Option<usize> {
    let bytes = lower.as_bytes();
    let mut pos = from;
    while let Some(i) = lower.get(pos..)?.find('<') {
        let at = pos + i;
        let name_start = at + 1;
        for tag in tags {
            let name_end = name_start + tag.len();
            let boundary = bytes
                .get(name_end)
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
            if lower[name_start..].starts_with(tag) && boundary {
                return Some(at);
            }
        }
        pos = name_start;
    }
    None
}

fn find_close(lower: &str, from: usize, tags: &[&str]) -> Option<usize> {
    tags.iter()
        .filter_map(|tag| lower.get(from..)?.find(&format!("</{tag}")).map(|i| from + i))
        .min()
}

fn elements<'a>(html: &'a str, tags: &[&str]) -> Vec<Element<'a>> {
    let lower = html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(open) = find_open(&lower, pos, tags) {
        let Some(gt) = lower[open..].find('>').map(|i| open + i) else {
            break;
        };
        let body = gt + 1;
        let end = match (find_close(&lower, body, tags), find_open(&lower, body, tags)) {
            (Some(c), Some(n)) => c.min(n),
            (Some(c), None) => c,
            (None, Some(n)) => n,
            (None, None) => html.len(),
        };
        out.push(Element {
            offset: open,
            open_tag: &html[open..gt],
            inner: &html[body..end],
        });
        pos = end;
    }
    out
}

fn row_cells(row: &Element<'_>) -> Vec<String> {
    elements(row.inner, &["td", "th"])
        .iter()
        .map(|cell| cell_text(cell.inner))
        .collect()
}

fn marked_rows(html: &str) -> Vec<Vec<String>> {
    elements(html, &["tr"])
        .iter()
        .filter(|row| row.open_tag.to_ascii_lowercase().contains(ROW_CLASS))
        .map(row_cells)
        .collect()
}

fn point(cells: &[String], at: usize) -> PassPoint {
    PassPoint {
        time: cells[at].clone(),
        altitude: degree_markup(&cells[at + 1]),
        azimuth: degree_markup(&cells[at + 2]),
    }
}

/// Visible ISS passes: twelve cells per row, the last (pass type) ignored.
pub fn parse_iss_passes(html: &str) -> Vec<EventRow> {
    let mut rows = Vec::new();
    for cells in marked_rows(html) {
        if cells.len() != ISS_COLUMNS {
            warn!("ISS row has {} columns, expected {}; skipped", cells.len(), ISS_COLUMNS);
            continue;
        }
        let Some(date) = RowDate::parse(&cells[0]) else {
            warn!("ISS row has unreadable date {:?}; skipped", cells[0]);
            continue;
        };
        rows.push(EventRow::IssPass(IssPassRow {
            date,
            magnitude: cells[1].clone(),
            start: point(&cells, 2),
            highest: point(&cells, 5),
            end: point(&cells, 8),
        }));
    }
    debug!("parsed {} ISS passes", rows.len());
    rows
}

/// Iridium flares: eight cells per row, the first holding `"<date>, <time>"`.
pub fn parse_iridium_flares(html: &str) -> Vec<EventRow> {
    let mut rows = Vec::new();
    for cells in marked_rows(html) {
        if cells.len() != IRIDIUM_COLUMNS {
            warn!(
                "Iridium row has {} columns, expected {}; skipped",
                cells.len(),
                IRIDIUM_COLUMNS
            );
            continue;
        }
        let (date, time) = cells[0].split_once(',').unwrap_or((cells[0].as_str(), ""));
        let Some(date) = RowDate::parse(date) else {
            warn!("Iridium row has unreadable date {:?}; skipped", cells[0]);
            continue;
        };
        rows.push(EventRow::IridiumFlare(IridiumFlareRow {
            date,
            time: time.trim().to_string(),
            magnitude: cells[1].clone(),
            altitude: degree_markup(&cells[2]),
            azimuth: degree_markup(&cells[3]),
            satellite: cells[4].clone(),
        }));
    }
    debug!("parsed {} Iridium flares", rows.len());
    rows
}

/// Values of the row whose first cell is `label`, label excluded.
fn labelled<'a>(rows: &'a [Vec<String>], label: &str) -> &'a [String] {
    rows.iter()
        .find(|cells| cells.first().is_some_and(|c| c.eq_ignore_ascii_case(label)))
        .map(|cells| &cells[1..])
        .unwrap_or(&[])
}

/// Planet summary, anchored on the table with a `Mercury` header cell.
///
/// Every row is dated `today`. Rise/set/transit times are left as printed (UT).
pub fn parse_planet_table(html: &str, today: NaiveDate) -> Result<Vec<EventRow>, FetchError> {
    let lower = html.to_ascii_lowercase();
    let table = elements(html, &["tr"])
        .iter()
        .map(|row| (row.offset, row_cells(row)))
        .find(|(_, cells)| cells.iter().any(|c| c == "Mercury"))
        .map(|(offset, _)| {
            let start = lower[..offset].rfind("<table").unwrap_or(0);
            let end = lower[offset..].find("</table").map_or(html.len(), |i| offset + i);
            &html[start..end]
        })
        .ok_or_else(|| FetchError::Parse("planet table not found".into()))?;

    let rows: Vec<Vec<String>> = elements(table, &["tr"]).iter().map(row_cells).collect();
    let names: Vec<&String> = rows
        .iter()
        .find(|cells| cells.iter().any(|c| c == "Mercury"))
        .map(|cells| cells.iter().filter(|c| !c.is_empty()).collect())
        .unwrap_or_default();

    let rises = labelled(&rows, "Rises");
    let sets = labelled(&rows, "Sets");
    let meridians = labelled(&rows, "Meridian transit");
    let constellations = labelled(&rows, "Constellation");
    let value = |column: &[String], i: usize| column.get(i).cloned().unwrap_or_default();

    let date = RowDate::from_date(today);
    let planets = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            EventRow::PlanetPosition(PlanetPositionRow {
                date,
                name: name.to_string(),
                rise: value(rises, i),
                set: value(sets, i),
                meridian: value(meridians, i),
                constellation: value(constellations, i),
            })
        })
        .collect::<Vec<_>>();
    debug!("parsed {} planets", planets.len());
    Ok(planets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_PAGE: &str = r#"
<html><body><table class="standardTable">
<thead><tr><td>Date</td><td>Brightness</td></tr></thead>
<tbody>
<TR class="clickableRow" onclick="window.location='passdetails.aspx'">
  <td><a href="passdetails.aspx">18 Oct</a></td><td>-3.4</td>
  <td>19:20:05</td><td>10&deg;</td><td>NW</td>
  <td>19:23:22</td><td>58Â°</td><td>NE</td>
  <td>19:26:40</td><td>10°</td><td>ESE</td>
  <td>visible</td>
</TR>
<tr class="clickableRow"><td>19 Oct</td><td>-1.2</td><td>broken</td></tr>
<tr class="clickableRow">
  <td>20 Oct</td><td>-2.0</td>
  <td>05:01:00</td><td>12°</td><td>SSW</td>
  <td>05:03:30</td><td>31°</td><td>SE</td>
  <td>05:06:10</td><td>10°</td><td>E</td>
  <td>visible</td>
</tr>
</tbody></table></body></html>"#;

    #[test]
    fn test_parse_iss_passes_skips_short_rows() {
        let rows = parse_iss_passes(ISS_PAGE);
        assert_eq!(rows.len(), 2);
        let EventRow::IssPass(first) = &rows[0] else {
            panic!("expected an ISS pass");
        };
        assert_eq!(first.date, RowDate::new(10, 18).unwrap());
        assert_eq!(first.magnitude, "-3.4");
        assert_eq!(first.start.altitude, "10°");
        assert_eq!(first.highest.time, "19:23:22");
        assert_eq!(first.highest.altitude, "58°");
        assert_eq!(first.end.azimuth, "ESE");
        assert_eq!(rows[1].date(), RowDate::new(10, 20).unwrap());
    }

    #[test]
    fn test_parse_iss_page_without_rows() {
        assert!(parse_iss_passes("<html><body>No visible passes</body></html>").is_empty());
    }

    #[test]
    fn test_parse_iridium_flares() {
        let page = r#"<table>
<tr class="clickableRow"><td>Oct 19, 18:44:12</td><td>-6.1</td><td>22&#176;</td>
<td>291° (WNW)</td><td>Iridium 16</td><td>x</td><td>y</td><td>z</td></tr>
<tr class="clickableRow"><td>Oct 20, 18:00:00</td><td>-1.0</td></tr>
</table>"#;
        let rows = parse_iridium_flares(page);
        assert_eq!(rows.len(), 1);
        let EventRow::IridiumFlare(flare) = &rows[0] else {
            panic!("expected an Iridium flare");
        };
        assert_eq!(flare.date, RowDate::new(10, 19).unwrap());
        assert_eq!(flare.time, "18:44:12");
        assert_eq!(flare.altitude, "22°");
        assert_eq!(flare.azimuth, "291° (WNW)");
        assert_eq!(flare.satellite, "Iridium 16");
    }

    const PLANET_PAGE: &str = r#"
<table><tr><td>menu</td></tr></table>
<table class="standardTable">
<thead><tr><td></td><td>Mercury</td><td>Venus</td><td>Mars</td></tr></thead>
<tbody>
<tr><td>Constellation</td><td><a href="c.aspx">Virgo</a></td><td><a>Libra</a></td><td><a>Leo</a></td></tr>
<tr><td>Meridian transit</td><td>17:40</td><td>19:02</td><td>14:10</td></tr>
<tr><td>Rises</td><td>11:20</td><td>12:51</td><td>07:30</td></tr>
<tr><td>Sets</td><td>23:59</td><td>01:13</td><td>20:50</td></tr>
</tbody></table>"#;

    #[test]
    fn test_parse_planet_table() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let rows = parse_planet_table(PLANET_PAGE, today).unwrap();
        assert_eq!(rows.len(), 3);
        let EventRow::PlanetPosition(venus) = &rows[1] else {
            panic!("expected a planet row");
        };
        assert_eq!(venus.name, "Venus");
        assert_eq!(venus.constellation, "Libra");
        assert_eq!(venus.meridian, "19:02");
        assert_eq!(venus.rise, "12:51");
        assert_eq!(venus.set, "01:13");
        assert!(rows.iter().all(|r| r.date() == RowDate::new(10, 18).unwrap()));
    }

    #[test]
    fn test_missing_planet_anchor_is_parse_error() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let err = parse_planet_table("<table><tr><td>Sun</td></tr></table>", today).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
