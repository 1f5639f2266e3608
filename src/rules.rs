use anyhow::{Context, Result, bail};
use regex::{Regex, RegexBuilder};

/// How raster overlays are located for a source file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OverlayStrategy {
    /// Overlay names start with the whole source name.
    Prefix,
    /// Overlay names are the `width` characters following the first `delimiter`.
    FixedOffset { delimiter: char, width: usize },
}

#[derive(Debug)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub key_expression: &'static str,
    pub overlay: OverlayStrategy,
}

/// Selection order matters: it is the order shown by `embedpages rules`.
pub const RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "Loft|Ann",
        key_expression: r"^(\d{5,7}_\d{3,5}(?:_ALT\d|_B\d|_D\d)?)",
        overlay: OverlayStrategy::Prefix,
    },
    ExtractionRule {
        name: "CBK",
        key_expression: r"^(\d{15}_\d{4})",
        overlay: OverlayStrategy::Prefix,
    },
    ExtractionRule {
        name: "NY&CO",
        key_expression: r"^(.+)$",
        overlay: OverlayStrategy::Prefix,
    },
    ExtractionRule {
        name: "UNIQLO",
        key_expression: r"^([a-z]{4}-[0-9a-z]{8}_\d{2}_[0-9a-z]{2})",
        overlay: OverlayStrategy::Prefix,
    },
    ExtractionRule {
        name: "Cacique",
        key_expression: r"^(cq-\d{6}_\d{10}_\d{7})",
        overlay: OverlayStrategy::FixedOffset {
            delimiter: '_',
            width: 10,
        },
    },
];

pub const DEFAULT_RULE: &str = "CBK";

/// The rule selected for a run, with its key expression compiled once.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    rule: &'static ExtractionRule,
    key: Regex,
}

impl ActiveRule {
    pub fn select(name: &str) -> Result<Self> {
        let Some(rule) = RULES
            .iter()
            .find(|rule| rule.name.eq_ignore_ascii_case(name.trim()))
        else {
            let known = RULES.iter().map(|rule| rule.name).collect::<Vec<_>>();
            bail!(
                "unknown extraction rule '{}' (expected one of: {})",
                name,
                known.join(", ")
            );
        };

        Self::compile(rule)
    }

    pub fn compile(rule: &'static ExtractionRule) -> Result<Self> {
        let key = RegexBuilder::new(rule.key_expression)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("failed to compile key expression for rule {}", rule.name))?;

        Ok(Self { rule, key })
    }

    pub fn name(&self) -> &'static str {
        self.rule.name
    }

    pub fn key_expression(&self) -> &Regex {
        &self.key
    }

    pub fn overlay(&self) -> OverlayStrategy {
        self.rule.overlay
    }
}
