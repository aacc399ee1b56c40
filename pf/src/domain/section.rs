//! The section plan

use serde::{Deserialize, Serialize};

/// Role of one planned slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    /// Opening hit shot
    Hero,
    /// Unique selling point
    Usp,
    /// Product information / specification sheet
    Specs,
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hero => write!(f, "hero"),
            Self::Usp => write!(f, "usp"),
            Self::Specs => write!(f, "specs"),
        }
    }
}

impl SectionType {
    /// Badge shown on a slide in previews
    pub fn badge(&self, index: usize) -> String {
        match self {
            Self::Hero => "HERO HIT-SHOT".to_string(),
            Self::Specs => "TECH DATA".to_string(),
            Self::Usp => format!("CORE USP {}", index),
        }
    }
}

/// One planned section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub title: String,
    /// Image-generation prompt for this section
    pub prompt: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
}

/// Ordered section plan for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignPlan {
    pub sections: Vec<SectionDescriptor>,
    #[serde(default)]
    pub brand_theme: String,
}

impl DesignPlan {
    /// Whether the plan opens with a hero, ends with specs and has only usp
    /// sections in between
    pub fn follows_convention(&self) -> bool {
        let types: Vec<SectionType> = self.sections.iter().map(|s| s.section_type).collect();
        match types.as_slice() {
            [] => false,
            [SectionType::Hero, middle @ .., SectionType::Specs] => middle.iter().all(|t| *t == SectionType::Usp),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(t: SectionType) -> SectionDescriptor {
        SectionDescriptor {
            title: t.to_string(),
            prompt: "p".to_string(),
            section_type: t,
        }
    }

    #[test]
    fn test_deserialize_plan_json() {
        let json = r#"{"sections":[{"title":"Hit","prompt":"studio shot","type":"hero"},{"title":"Info","prompt":"flat lay","type":"specs"}]}"#;
        let plan: DesignPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.sections.len(), 2);
        assert_eq!(plan.sections[0].section_type, SectionType::Hero);
        assert_eq!(plan.brand_theme, "");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"sections":[{"title":"x","prompt":"y","type":"banner"}]}"#;
        assert!(serde_json::from_str::<DesignPlan>(json).is_err());
    }

    #[test]
    fn test_follows_convention() {
        let good = DesignPlan {
            sections: vec![
                section(SectionType::Hero),
                section(SectionType::Usp),
                section(SectionType::Usp),
                section(SectionType::Specs),
            ],
            brand_theme: String::new(),
        };
        assert!(good.follows_convention());

        let bad = DesignPlan {
            sections: vec![section(SectionType::Usp), section(SectionType::Specs)],
            brand_theme: String::new(),
        };
        assert!(!bad.follows_convention());
        assert!(!DesignPlan::default().follows_convention());
    }

    #[test]
    fn test_badge() {
        assert_eq!(SectionType::Hero.badge(0), "HERO HIT-SHOT");
        assert_eq!(SectionType::Usp.badge(2), "CORE USP 2");
        assert_eq!(SectionType::Specs.badge(5), "TECH DATA");
    }
}
