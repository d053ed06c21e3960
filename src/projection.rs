use serde::Serialize;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::calc;
use crate::record::StudentRecord;

pub const DEFAULT_PAGE_SIZE: usize = 10;
const PAGER_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    CreatedAtDesc,
    PercentageDesc,
    PercentageAsc,
    NameAsc,
    NameDesc,
}

impl SortMode {
    /// Unknown keys fall back to newest-first.
    pub fn parse(s: &str) -> Self {
        match s {
            "createdAt_desc" => SortMode::CreatedAtDesc,
            "percentage_desc" => SortMode::PercentageDesc,
            "percentage_asc" => SortMode::PercentageAsc,
            "name_asc" => SortMode::NameAsc,
            "name_desc" => SortMode::NameDesc,
            _ => SortMode::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::CreatedAtDesc => "createdAt_desc",
            SortMode::PercentageDesc => "percentage_desc",
            SortMode::PercentageAsc => "percentage_asc",
            SortMode::NameAsc => "name_asc",
            SortMode::NameDesc => "name_desc",
        }
    }

    fn comparator(self) -> Comparator {
        match self {
            SortMode::CreatedAtDesc => created_at_desc,
            SortMode::PercentageDesc => percentage_desc,
            SortMode::PercentageAsc => percentage_asc,
            SortMode::NameAsc => name_asc,
            SortMode::NameDesc => name_desc,
        }
    }
}

type Comparator = fn(&StudentRecord, &StudentRecord) -> Ordering;

fn created_at_desc(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

fn percentage_desc(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    b.percentage().total_cmp(&a.percentage())
}

fn percentage_asc(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    a.percentage().total_cmp(&b.percentage())
}

fn name_asc(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    locale_compare(&a.name, &b.name)
}

fn name_desc(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    locale_compare(&b.name, &a.name)
}

fn fold_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Collation close to a default locale compare: letters first compare
/// without accents or case, then accents break ties, then lowercase sorts
/// before uppercase.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let fa = fold_accents(a);
    let fb = fold_accents(b);
    fa.to_lowercase()
        .cmp(&fb.to_lowercase())
        .then_with(|| a.nfd().flat_map(char::to_lowercase).cmp(b.nfd().flat_map(char::to_lowercase)))
        .then_with(|| {
            fa.chars()
                .map(char::is_uppercase)
                .cmp(fb.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone)]
pub struct ViewRequest {
    pub query: String,
    pub sort: SortMode,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort: SortMode::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub count: usize,
    #[serde(serialize_with = "calc::serialize_number")]
    pub average_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection<'a> {
    pub rows: Vec<&'a StudentRecord>,
    /// Page actually shown after clamping.
    pub page: usize,
    pub total_pages: usize,
    /// Offset of the first row in the filtered set.
    pub start_index: usize,
    pub filtered_count: usize,
    pub stats: Option<Stats>,
}

pub fn matches_query(r: &StudentRecord, query_lower: &str) -> bool {
    query_lower.is_empty()
        || r.name.to_lowercase().contains(query_lower)
        || r.roll.to_lowercase().contains(query_lower)
}

pub fn stats(rows: &[&StudentRecord]) -> Option<Stats> {
    if rows.is_empty() {
        return None;
    }
    let sum: f64 = rows.iter().map(|r| r.percentage()).sum();
    Some(Stats {
        count: rows.len(),
        average_percentage: calc::round_2(sum / rows.len() as f64),
    })
}

/// Filter, sort, paginate and aggregate `all` for display.
pub fn project<'a>(all: &'a [StudentRecord], req: &ViewRequest) -> Projection<'a> {
    let query = req.query.to_lowercase();
    let mut filtered: Vec<&StudentRecord> =
        all.iter().filter(|r| matches_query(r, &query)).collect();

    let cmp = req.sort.comparator();
    filtered.sort_by(|a, b| cmp(a, b));

    let stats = stats(&filtered);

    let page_size = if req.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        req.page_size
    };
    let total_pages = filtered.len().div_ceil(page_size).max(1);
    let page = req.page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(filtered.len());
    let filtered_count = filtered.len();
    let rows = if start < end {
        filtered[start..end].to_vec()
    } else {
        Vec::new()
    };

    Projection {
        rows,
        page,
        total_pages,
        start_index: start,
        filtered_count,
        stats,
    }
}

/// Page numbers for the pager buttons, centred on `page` where possible.
/// Empty when there is only one page.
pub fn pagination_window(page: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let start = page.saturating_sub(PAGER_WINDOW / 2).max(1);
    let end = (start + PAGER_WINDOW - 1).min(total_pages);
    (start..=end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Subject;

    fn rec(id: &str, created_at: i64, name: &str, roll: &str, marks: f64) -> StudentRecord {
        StudentRecord::with_identity(
            id,
            created_at,
            name,
            roll,
            vec![Subject::new("Math", Some(marks))],
        )
    }

    fn ids(p: &Projection<'_>) -> Vec<String> {
        p.rows.iter().map(|r| r.id.clone()).collect()
    }

    fn sample() -> Vec<StudentRecord> {
        vec![
            rec("a", 100, "Alexa Roy", "R9", 72.0),
            rec("b", 300, "Bob", "R2", 55.5),
            rec("c", 200, "carla", "X1", 91.0),
        ]
    }

    #[test]
    fn query_matches_name_or_roll_case_insensitively() {
        let all = sample();
        let p = project(
            &all,
            &ViewRequest {
                query: "alex".into(),
                ..Default::default()
            },
        );
        assert_eq!(ids(&p), vec!["a"]);

        let p = project(
            &all,
            &ViewRequest {
                query: "r2".into(),
                ..Default::default()
            },
        );
        assert_eq!(ids(&p), vec!["b"]);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let all = sample();
        let p = project(&all, &ViewRequest::default());
        assert_eq!(ids(&p), vec!["b", "c", "a"]);
    }

    #[test]
    fn sort_modes() {
        let all = sample();
        let by = |sort| {
            ids(&project(
                &all,
                &ViewRequest {
                    sort,
                    ..Default::default()
                },
            ))
        };
        assert_eq!(by(SortMode::PercentageDesc), vec!["c", "a", "b"]);
        assert_eq!(by(SortMode::PercentageAsc), vec!["b", "a", "c"]);
        assert_eq!(by(SortMode::NameAsc), vec!["a", "b", "c"]);
        assert_eq!(by(SortMode::NameDesc), vec!["c", "b", "a"]);
    }

    #[test]
    fn unknown_sort_key_falls_back() {
        assert_eq!(SortMode::parse("bogus"), SortMode::CreatedAtDesc);
        assert_eq!(SortMode::parse("name_desc"), SortMode::NameDesc);
        assert_eq!(SortMode::parse(SortMode::PercentageAsc.as_str()), SortMode::PercentageAsc);
    }

    #[test]
    fn locale_compare_folds_case_and_accents() {
        assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_compare("Émile", "Eve"), Ordering::Less);
        assert_eq!(locale_compare("zoe", "Émile"), Ordering::Greater);
        assert_eq!(locale_compare("a", "A"), Ordering::Less);
        assert_eq!(locale_compare("e", "é"), Ordering::Less);
        assert_eq!(locale_compare("Same", "Same"), Ordering::Equal);
    }

    #[test]
    fn pagination_counts_and_clamps() {
        let all: Vec<StudentRecord> = (0..23)
            .map(|i| rec(&format!("s{i}"), i, &format!("S{i}"), &format!("R{i}"), 50.0))
            .collect();
        let p = project(
            &all,
            &ViewRequest {
                page: 2,
                page_size: 10,
                ..Default::default()
            },
        );
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.rows.len(), 10);
        assert_eq!(p.start_index, 10);

        let p = project(
            &all,
            &ViewRequest {
                page: 99,
                page_size: 10,
                ..Default::default()
            },
        );
        assert_eq!(p.page, 3);
        assert_eq!(p.rows.len(), 3);
        assert_eq!(p.start_index, 20);

        let p = project(
            &all,
            &ViewRequest {
                page: 0,
                page_size: 0,
                ..Default::default()
            },
        );
        assert_eq!(p.page, 1);
        assert_eq!(p.rows.len(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn empty_set_has_one_page_and_no_stats() {
        let all: Vec<StudentRecord> = Vec::new();
        let p = project(
            &all,
            &ViewRequest {
                page: 4,
                ..Default::default()
            },
        );
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.page, 1);
        assert!(p.rows.is_empty());
        assert!(p.stats.is_none());
    }

    #[test]
    fn stats_cover_filtered_not_paged_rows() {
        let all = sample();
        let p = project(
            &all,
            &ViewRequest {
                page_size: 1,
                ..Default::default()
            },
        );
        assert_eq!(p.rows.len(), 1);
        let s = p.stats.expect("stats");
        assert_eq!(s.count, 3);
        assert_eq!(s.average_percentage, 72.83);
    }

    #[test]
    fn pager_window() {
        assert!(pagination_window(1, 1).is_empty());
        assert_eq!(pagination_window(1, 3), vec![1, 2, 3]);
        assert_eq!(pagination_window(5, 10), vec![3, 4, 5, 6, 7]);
        assert_eq!(pagination_window(10, 10), vec![8, 9, 10]);
    }

    #[test]
    fn projection_does_not_reorder_input() {
        let all = sample();
        let _ = project(
            &all,
            &ViewRequest {
                sort: SortMode::NameDesc,
                ..Default::default()
            },
        );
        assert_eq!(all[0].id, "a");
    }
}
