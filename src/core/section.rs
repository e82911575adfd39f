//! Paper section kinds.

use serde::{Deserialize, Serialize};

/// A fixed kind of paper section.
///
/// Variants are declared in canonical paper order, so the derived [`Ord`]
/// sorts sections the way they appear in the finished document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Abstract.
    Abstract,
    /// Introduction.
    Introduction,
    /// Literature review.
    LiteratureReview,
    /// Theoretical framework.
    TheoreticalFramework,
    /// Methodology.
    Methodology,
    /// Analysis and findings.
    Analysis,
    /// Discussion.
    Discussion,
    /// Conclusion.
    Conclusion,
    /// Reference list.
    References,
}

impl SectionKind {
    /// All section kinds in canonical paper order.
    pub const ALL: [Self; 9] = [
        Self::Abstract,
        Self::Introduction,
        Self::LiteratureReview,
        Self::TheoreticalFramework,
        Self::Methodology,
        Self::Analysis,
        Self::Discussion,
        Self::Conclusion,
        Self::References,
    ];

    /// Body sections written from the outline before the framing sections.
    pub const BODY: [Self; 5] = [
        Self::LiteratureReview,
        Self::TheoreticalFramework,
        Self::Methodology,
        Self::Analysis,
        Self::Discussion,
    ];

    /// Parses a section name.
    ///
    /// Accepts the snake-case identifier as well as human spellings such as
    /// `"Literature Review"` or `"literature-review"`. Returns `None` for
    /// names outside the taxonomy.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "abstract" => Some(Self::Abstract),
            "introduction" => Some(Self::Introduction),
            "literature_review" => Some(Self::LiteratureReview),
            "theoretical_framework" => Some(Self::TheoreticalFramework),
            "methodology" => Some(Self::Methodology),
            "analysis" | "analysis_and_findings" => Some(Self::Analysis),
            "discussion" => Some(Self::Discussion),
            "conclusion" => Some(Self::Conclusion),
            "references" => Some(Self::References),
            _ => None,
        }
    }

    /// Returns the snake-case identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::Introduction => "introduction",
            Self::LiteratureReview => "literature_review",
            Self::TheoreticalFramework => "theoretical_framework",
            Self::Methodology => "methodology",
            Self::Analysis => "analysis",
            Self::Discussion => "discussion",
            Self::Conclusion => "conclusion",
            Self::References => "references",
        }
    }

    /// Heading used in rendered documents.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Abstract => "Abstract",
            Self::Introduction => "Introduction",
            Self::LiteratureReview => "Literature Review",
            Self::TheoreticalFramework => "Theoretical Framework",
            Self::Methodology => "Methodology",
            Self::Analysis => "Analysis and Findings",
            Self::Discussion => "Discussion",
            Self::Conclusion => "Conclusion",
            Self::References => "References",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("introduction", Some(SectionKind::Introduction))]
    #[test_case("Literature Review", Some(SectionKind::LiteratureReview))]
    #[test_case("theoretical-framework", Some(SectionKind::TheoreticalFramework))]
    #[test_case("  CONCLUSION ", Some(SectionKind::Conclusion))]
    #[test_case("cross-section", None)]
    #[test_case("appendix", None)]
    fn test_parse(input: &str, expected: Option<SectionKind>) {
        assert_eq!(SectionKind::parse(input), expected);
    }

    #[test]
    fn test_canonical_order() {
        let mut shuffled = vec![
            SectionKind::Conclusion,
            SectionKind::Abstract,
            SectionKind::Methodology,
            SectionKind::Introduction,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                SectionKind::Abstract,
                SectionKind::Introduction,
                SectionKind::Methodology,
                SectionKind::Conclusion,
            ]
        );
    }

    #[test]
    fn test_as_str_roundtrips_through_parse() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::parse(kind.as_str()), Some(kind));
        }
    }
}
