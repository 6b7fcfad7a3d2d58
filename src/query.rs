// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Derived views over the library. Nothing here mutates the store.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::paper::{CategoryStats, Paper};

/// Category sentinel that matches every paper.
pub const ALL_CATEGORIES: &str = "All";

/// How many categories the dashboard highlights. They are ranked by paper
/// count rather than taken in first-appearance order, so the busiest
/// categories always make the cut.
pub const TOP_CATEGORY_LIMIT: usize = 4;

/// Figures behind the analytics dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total: usize,
    pub categories: Vec<CategoryStats>,
    pub top: Vec<CategoryStats>,
}

/// Papers matching `query` (case-insensitive substring of title, abstract or
/// authors) and `category` (exact, or [`ALL_CATEGORIES`]), in input order.
pub fn filter_papers<'a, I>(papers: I, query: &str, category: &str) -> Vec<&'a Paper>
where
    I: IntoIterator<Item = &'a Paper>,
{
    let needle = query.to_lowercase();
    papers
        .into_iter()
        .filter(|paper| matches_search(paper, &needle) && matches_category(paper, category))
        .collect()
}

fn matches_search(paper: &Paper, needle: &str) -> bool {
    paper.title.to_lowercase().contains(needle)
        || paper.abstract_text.to_lowercase().contains(needle)
        || paper.authors.to_lowercase().contains(needle)
}

fn matches_category(paper: &Paper, category: &str) -> bool {
    category == ALL_CATEGORIES || paper.category == category
}

/// Distinct categories plus the sentinel, sorted.
pub fn categories<'a, I>(papers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Paper>,
{
    let mut set: BTreeSet<&str> = papers.into_iter().map(|p| p.category.as_str()).collect();
    set.insert(ALL_CATEGORIES);
    set.into_iter().map(str::to_string).collect()
}

/// Paper count per category, in order of first appearance.
pub fn category_counts<'a, I>(papers: I) -> Vec<CategoryStats>
where
    I: IntoIterator<Item = &'a Paper>,
{
    let mut stats: Vec<CategoryStats> = Vec::new();
    for paper in papers {
        match stats.iter_mut().find(|s| s.name == paper.category) {
            Some(existing) => existing.count += 1,
            None => stats.push(CategoryStats {
                name: paper.category.clone(),
                count: 1,
            }),
        }
    }
    stats
}

/// The `n` largest categories; equal counts keep first-appearance order.
pub fn top_categories<'a, I>(papers: I, n: usize) -> Vec<CategoryStats>
where
    I: IntoIterator<Item = &'a Paper>,
{
    let mut stats = category_counts(papers);
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats.truncate(n);
    stats
}

pub fn library_stats<'a, I>(papers: I) -> LibraryStats
where
    I: IntoIterator<Item = &'a Paper>,
{
    let papers: Vec<&Paper> = papers.into_iter().collect();
    LibraryStats {
        total: papers.len(),
        categories: category_counts(papers.iter().copied()),
        top: top_categories(papers.iter().copied(), TOP_CATEGORY_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::paper::PaperStatus;

    fn paper(title: &str, authors: &str, abstract_text: &str, category: &str) -> Paper {
        Paper {
            id: Uuid::new_v4(),
            title: title.to_string(),
            authors: authors.to_string(),
            abstract_text: abstract_text.to_string(),
            category: category.to_string(),
            tags: vec![],
            url: String::new(),
            date_added: Utc::now(),
            ai_summary: None,
            status: PaperStatus::Analyzed,
        }
    }

    fn sample() -> Vec<Paper> {
        vec![
            paper("Attention Is All You Need", "Vaswani", "Transformers.", "AI/Machine Learning"),
            paper("CRISPR screens", "Doudna", "Gene editing at scale.", "Biology"),
            paper("Dark matter halos", "Navarro", "Simulations of attention-free cosmology.", "Physics"),
        ]
    }

    #[test]
    fn empty_query_and_all_is_identity() {
        let papers = sample();
        let filtered = filter_papers(&papers, "", ALL_CATEGORIES);
        let expected: Vec<&Paper> = papers.iter().collect();
        assert_eq!(filtered, expected);
    }

    #[test]
    fn search_ignores_case() {
        let papers = sample();
        for query in ["attention", "ATTENTION", "All You"] {
            let titles: Vec<_> = filter_papers(&papers, query, ALL_CATEGORIES)
                .iter()
                .map(|p| p.title.as_str())
                .collect();
            assert!(titles.contains(&"Attention Is All You Need"), "query {query}");
        }
    }

    #[test]
    fn search_covers_abstract_and_authors() {
        let papers = sample();
        assert_eq!(filter_papers(&papers, "gene editing", ALL_CATEGORIES).len(), 1);
        assert_eq!(filter_papers(&papers, "navarro", ALL_CATEGORIES).len(), 1);
        assert!(filter_papers(&papers, "quantum", ALL_CATEGORIES).is_empty());
    }

    #[test]
    fn category_and_search_combine() {
        let papers = sample();
        let hits = filter_papers(&papers, "attention", "Physics");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dark matter halos");
        assert!(filter_papers(&papers, "", "Medicine").is_empty());
    }

    #[test]
    fn all_sentinel_equals_search_only() {
        let papers = sample();
        let search_only: Vec<&Paper> = papers
            .iter()
            .filter(|p| p.title.to_lowercase().contains("d")
                || p.abstract_text.to_lowercase().contains("d")
                || p.authors.to_lowercase().contains("d"))
            .collect();
        assert_eq!(filter_papers(&papers, "d", ALL_CATEGORIES), search_only);
    }

    #[test]
    fn categories_are_distinct_sorted_with_sentinel() {
        let mut papers = sample();
        papers.push(paper("Another", "", "", "Biology"));
        assert_eq!(
            categories(&papers),
            ["AI/Machine Learning", "All", "Biology", "Physics"]
        );
        assert_eq!(categories(&Vec::<Paper>::new()), ["All"]);
    }

    #[test]
    fn counts_ignore_input_order() {
        let orders = [["A", "A", "B"], ["B", "A", "A"], ["A", "B", "A"]];
        for order in orders {
            let papers: Vec<Paper> = order.iter().map(|c| paper("t", "", "", c)).collect();
            let counts: HashMap<String, usize> = category_counts(&papers)
                .into_iter()
                .map(|s| (s.name, s.count))
                .collect();
            assert_eq!(counts, HashMap::from([("A".to_string(), 2), ("B".to_string(), 1)]));
        }
    }

    #[test]
    fn top_categories_rank_by_count() {
        let papers: Vec<Paper> = ["X", "Y", "Y", "Z", "Z", "Z", "W"]
            .iter()
            .map(|c| paper("t", "", "", c))
            .collect();
        let top: Vec<_> = top_categories(&papers, 3).into_iter().map(|s| s.name).collect();
        assert_eq!(top, ["Z", "Y", "X"]);
    }

    #[test]
    fn stats_total_and_top_limit() {
        let papers: Vec<Paper> = ["A", "B", "C", "D", "E", "E"]
            .iter()
            .map(|c| paper("t", "", "", c))
            .collect();
        let stats = library_stats(&papers);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.categories.len(), 5);
        assert_eq!(stats.top.len(), TOP_CATEGORY_LIMIT);
        assert_eq!(stats.top[0], CategoryStats { name: "E".to_string(), count: 2 });

        let empty = library_stats(&Vec::<Paper>::new());
        assert_eq!(empty.total, 0);
        assert!(empty.top.is_empty());
    }
}
