// Groups projects into the ordered rating buckets of a certification scheme.
//
// Every declared rating gets a bucket, even when nothing lands in it, so
// chart axes stay identical across selections.

use crate::taxonomy::CertificationScheme;
use crate::types::Project;
use std::borrow::Borrow;
use tracing::debug;

/// Bar width (percent) for an empty bucket and lower bound for all bars.
pub const BAR_BASE_WIDTH_PCT: f64 = 25.0;

/// Floor applied to the largest bucket count when scaling bars.
pub const BAR_MIN_MAX_COUNT: usize = 4;

#[derive(Debug, Clone)]
pub struct RatingBucket<'a> {
    pub rating: &'a str,
    pub projects: Vec<&'a Project>,
}

impl RatingBucket<'_> {
    pub fn count(&self) -> usize {
        self.projects.len()
    }
}

#[derive(Debug, Clone)]
pub struct RatingBuckets<'a> {
    pub scheme: &'a CertificationScheme,
    buckets: Vec<RatingBucket<'a>>,
}

impl<'a> RatingBuckets<'a> {
    /// Buckets in the scheme's declared order.
    pub fn iter(&self) -> impl Iterator<Item = &RatingBucket<'a>> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, rating: &str) -> Option<&RatingBucket<'a>> {
        self.buckets
            .iter()
            .find(|b| b.rating.eq_ignore_ascii_case(rating))
    }

    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(RatingBucket::count).collect()
    }

    /// Number of projects that landed in any bucket.
    pub fn rated_total(&self) -> usize {
        self.buckets.iter().map(RatingBucket::count).sum()
    }

    pub fn max_count(&self) -> usize {
        scaled_max_count(self.counts())
    }

    /// Bar widths in bucket order.
    pub fn bar_widths(&self) -> Vec<f64> {
        let max = self.max_count();
        self.buckets
            .iter()
            .map(|b| bar_width(b.count(), max))
            .collect()
    }
}

pub fn bucket_by_rating<'a, P: Borrow<Project>>(
    projects: &'a [P],
    scheme: &'a CertificationScheme,
) -> RatingBuckets<'a> {
    let mut buckets: Vec<RatingBucket<'a>> = scheme
        .ratings
        .iter()
        .map(|r| RatingBucket {
            rating: r.as_str(),
            projects: Vec::new(),
        })
        .collect();

    let mut unrated = 0usize;
    for p in projects {
        let p: &'a Project = p.borrow();
        match scheme.resolve_rating(p) {
            Some(idx) => buckets[idx].projects.push(p),
            None => unrated += 1,
        }
    }
    debug!(
        scheme = %scheme.name,
        projects = projects.len(),
        unrated,
        "bucketed projects by rating"
    );

    RatingBuckets { scheme, buckets }
}

/// `max(all counts, BAR_MIN_MAX_COUNT)`.
pub fn scaled_max_count<I: IntoIterator<Item = usize>>(counts: I) -> usize {
    counts
        .into_iter()
        .fold(BAR_MIN_MAX_COUNT, |acc, c| acc.max(c))
}

pub fn bar_width(count: usize, max_count: usize) -> f64 {
    if count == 0 || max_count == 0 {
        return BAR_BASE_WIDTH_PCT;
    }
    let scaled = count as f64 / max_count as f64 * 100.0;
    scaled.max(BAR_BASE_WIDTH_PCT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{RatingSource, Taxonomy};

    fn rated(id: &str, rating: &str) -> Project {
        let mut p = Project::new(id, id, "Education");
        p.certifications.insert("BREEAM".into(), rating.into());
        p
    }

    #[test]
    fn empty_input_reports_every_bucket() {
        let t = Taxonomy::default();
        let scheme = t.scheme("LEED").expect("scheme");
        let none: Vec<Project> = Vec::new();
        let buckets = bucket_by_rating(&none, scheme);
        let ratings: Vec<&str> = buckets.iter().map(|b| b.rating).collect();
        assert_eq!(ratings, vec!["Platinum", "Gold", "Silver", "Certified"]);
        assert_eq!(buckets.counts(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn bucket_keeps_input_order() {
        let t = Taxonomy::default();
        let scheme = t.scheme("BREEAM").expect("scheme");
        let projects = vec![
            rated("c", "Excellent"),
            rated("a", "Good"),
            rated("b", "Excellent"),
        ];
        let buckets = bucket_by_rating(&projects, scheme);
        let ids: Vec<&str> = buckets
            .get("Excellent")
            .expect("bucket")
            .projects
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(buckets.rated_total(), 3);
    }

    #[test]
    fn accepts_borrowed_project_lists() {
        let scheme = CertificationScheme::new("Custom", &["A", "B"], RatingSource::Field("BREEAM".into()));
        let owned = vec![rated("x", "B"), rated("y", "Pass")];
        let refs: Vec<&Project> = owned.iter().collect();
        let buckets = bucket_by_rating(&refs, &scheme);
        assert_eq!(buckets.counts(), vec![0, 1]);
    }

    #[test]
    fn bar_widths_respect_floor() {
        assert_eq!(scaled_max_count([0, 1, 2]), 4);
        assert_eq!(scaled_max_count([0, 9]), 9);
        assert_eq!(bar_width(0, 9), BAR_BASE_WIDTH_PCT);
        assert_eq!(bar_width(3, 4), 75.0);
        assert_eq!(bar_width(9, 9), 100.0);
    }
}
