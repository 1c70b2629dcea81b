//! Match report: per-category similarity scores between a résumé and a job description.

use serde::{Deserialize, Serialize};

/// Scores in [0, 1] for each of the seven matched categories.
/// Immutable once received; persisted into history verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MatchReport {
    pub education: f64,
    pub experience: f64,
    pub technical_skill: f64,
    pub soft_skill: f64,
    pub tool: f64,
    pub certification: f64,
    pub designation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Education,
    Experience,
    TechnicalSkill,
    SoftSkill,
    Tool,
    Certification,
    Designation,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Education,
        Category::Experience,
        Category::TechnicalSkill,
        Category::SoftSkill,
        Category::Tool,
        Category::Certification,
        Category::Designation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Education => "Education",
            Category::Experience => "Experience",
            Category::TechnicalSkill => "Technical Skill",
            Category::SoftSkill => "Soft Skill",
            Category::Tool => "Tools Used",
            Category::Certification => "Certification",
            Category::Designation => "Designation",
        }
    }
}

/// Coarse rating bucket shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Strong, // ≥ 0.8
    Good,   // 0.6 – 0.79
    Fair,   // 0.4 – 0.59
    Weak,   // < 0.4
}

impl ScoreBand {
    pub fn classify(score: f64) -> Self {
        if score >= 0.8 {
            ScoreBand::Strong
        } else if score >= 0.6 {
            ScoreBand::Good
        } else if score >= 0.4 {
            ScoreBand::Fair
        } else {
            ScoreBand::Weak
        }
    }
}

impl MatchReport {
    pub fn score(&self, category: Category) -> f64 {
        match category {
            Category::Education => self.education,
            Category::Experience => self.experience,
            Category::TechnicalSkill => self.technical_skill,
            Category::SoftSkill => self.soft_skill,
            Category::Tool => self.tool,
            Category::Certification => self.certification,
            Category::Designation => self.designation,
        }
    }

    /// (category, score) pairs in display order.
    pub fn categories(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.score(*c)))
    }

    /// Unweighted mean of all seven categories.
    pub fn overall(&self) -> f64 {
        self.categories().map(|(_, s)| s).sum::<f64>() / Category::ALL.len() as f64
    }

    /// Every score must be a finite value in [0, 1].
    pub fn is_valid(&self) -> bool {
        self.categories()
            .all(|(_, s)| s.is_finite() && (0.0..=1.0).contains(&s))
    }
}
