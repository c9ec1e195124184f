//! Prompt templates for each generation type.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::GatewayError;

const BASE_SYSTEM: &str = "You are a senior B2B marketing strategist. \
Write concrete, specific copy grounded in the company information provided. \
Avoid filler and generic claims.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Icp,
    ValueProp,
    EmailSequence,
    LinkedInPost,
    LandingPage,
    BrandGuide,
}

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Icp => "icp",
            GenerationKind::ValueProp => "value-prop",
            GenerationKind::EmailSequence => "email-sequence",
            GenerationKind::LinkedInPost => "linkedin-post",
            GenerationKind::LandingPage => "landing-page",
            GenerationKind::BrandGuide => "brand-guide",
        }
    }

    pub fn system_prompt(self) -> String {
        let task = match self {
            GenerationKind::Icp => {
                "Derive three ideal customer profiles. For each give a name, role, company size, \
                 main pain points and buying triggers. Answer in JSON."
            }
            GenerationKind::ValueProp => {
                "Write value propositions for the given ideal customer profile: a headline, \
                 a one-sentence summary and three supporting benefits."
            }
            GenerationKind::EmailSequence => {
                "Write a cold outreach sequence of three short emails with subject lines, \
                 each building on the previous one."
            }
            GenerationKind::LinkedInPost => {
                "Write a LinkedIn post under 200 words with a strong opening line and a \
                 clear call to action."
            }
            GenerationKind::LandingPage => {
                "Write landing page copy: hero headline, subheadline, three feature sections, \
                 social proof placeholder and call to action."
            }
            GenerationKind::BrandGuide => {
                "Write a brief brand guide: voice, tone, vocabulary to use and avoid, and \
                 example phrases."
            }
        };
        format!("{BASE_SYSTEM}\n\n{task}")
    }

    pub fn user_prompt(self, params: &Value) -> String {
        let context = serde_json::to_string_pretty(params).unwrap_or_else(|_| params.to_string());
        format!("Generate the {self} using this context:\n\n{context}")
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "icp" => Ok(GenerationKind::Icp),
            "value-prop" => Ok(GenerationKind::ValueProp),
            "email-sequence" => Ok(GenerationKind::EmailSequence),
            "linkedin-post" => Ok(GenerationKind::LinkedInPost),
            "landing-page" => Ok(GenerationKind::LandingPage),
            "brand-guide" => Ok(GenerationKind::BrandGuide),
            other => Err(GatewayError::InvalidInput(format!(
                "unknown generation type: {other}"
            ))),
        }
    }
}
