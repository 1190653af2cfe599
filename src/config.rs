use crate::layout::LayoutOptions;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine settings. Every field is optional in serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSettings {
    /// Padding between the left-most extent and the origin after realignment.
    pub margin: f32,
    /// Minimum gap between the extents of neighbours in one rank.
    pub node_gap: f32,
    /// Length trimmed off a route's final segment for the arrowhead.
    pub arrow_length: f32,
    /// Added on both sides of the tallest node when sizing a rank band.
    pub rank_margin: f32,
    /// Divisor applied to the widest edge span between two ranks to get the
    /// extra gap between their bands.
    pub rank_separation_ratio: f32,
    /// Fraction of a node's size that auto ports move aside when forward
    /// and reversed edges share a side.
    pub port_separation_ratio: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            margin: 5.0,
            node_gap: 5.0,
            arrow_length: 3.0,
            rank_margin: 8.0,
            rank_separation_ratio: 2.0,
            port_separation_ratio: 0.25,
        }
    }
}

/// How the CLI turns labels into node and edge-label extents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub edge_label_padding: f32,
    pub label_line_height: f32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            node_padding_x: 30.0,
            node_padding_y: 15.0,
            edge_label_padding: 8.0,
            label_line_height: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutSettings,
    pub options: LayoutOptions,
    pub sizing: SizingConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutSettings::default(),
            options: LayoutOptions::default(),
            sizing: SizingConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    primary_color: Option<String>,
    primary_text_color: Option<String>,
    primary_border_color: Option<String>,
    line_color: Option<String>,
    edge_label_background: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    margin: Option<f32>,
    node_gap: Option<f32>,
    arrow_length: Option<f32>,
    rank_margin: Option<f32>,
    rank_separation_ratio: Option<f32>,
    port_separation_ratio: Option<f32>,
    detangle_passes: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizingConfigFile {
    node_padding_x: Option<f32>,
    node_padding_y: Option<f32>,
    edge_label_padding: Option<f32>,
    label_line_height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    sizing: Option<SizingConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Merge a JSON config document over the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.primary_color {
            config.theme.primary_color = v;
        }
        if let Some(v) = vars.primary_text_color {
            config.theme.primary_text_color = v;
        }
        if let Some(v) = vars.primary_border_color {
            config.theme.primary_border_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.edge_label_background {
            config.theme.edge_label_background = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
        if let Some(v) = layout.node_gap {
            config.layout.node_gap = v;
        }
        if let Some(v) = layout.arrow_length {
            config.layout.arrow_length = v;
        }
        if let Some(v) = layout.rank_margin {
            config.layout.rank_margin = v;
        }
        if let Some(v) = layout.rank_separation_ratio {
            if v.is_nan() || v <= 0.0 {
                anyhow::bail!("layout.rankSeparationRatio must be positive, got {v}");
            }
            config.layout.rank_separation_ratio = v;
        }
        if let Some(v) = layout.port_separation_ratio {
            config.layout.port_separation_ratio = v;
        }
        if let Some(v) = layout.detangle_passes {
            config.options.detangle_passes = v;
        }
    }

    if let Some(sizing) = parsed.sizing {
        if let Some(v) = sizing.node_padding_x {
            config.sizing.node_padding_x = v;
        }
        if let Some(v) = sizing.node_padding_y {
            config.sizing.node_padding_y = v;
        }
        if let Some(v) = sizing.edge_label_padding {
            config.sizing.edge_label_padding = v;
        }
        if let Some(v) = sizing.label_line_height {
            config.sizing.label_line_height = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: LayoutSettings = serde_json::from_str(r#"{"nodeGap": 12}"#).unwrap();
        assert_eq!(settings.node_gap, 12.0);
        assert_eq!(settings.margin, 5.0);
        assert_eq!(settings.rank_separation_ratio, 2.0);
    }

    #[test]
    fn config_file_overrides_layout_and_theme() {
        let config = parse_config(
            r##"{
                "theme": "modern",
                "themeVariables": {"lineColor": "#ff0000"},
                "layout": {"rankMargin": 4, "detanglePasses": 2},
                "sizing": {"nodePaddingX": 10}
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.line_color, "#ff0000");
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
        assert_eq!(config.layout.rank_margin, 4.0);
        assert_eq!(config.options.detangle_passes, 2);
        assert_eq!(config.sizing.node_padding_x, 10.0);
        assert_eq!(config.sizing.node_padding_y, 15.0);
    }

    #[test]
    fn rejects_non_positive_rank_separation() {
        assert!(parse_config(r#"{"layout": {"rankSeparationRatio": 0}}"#).is_err());
        assert!(parse_config(r#"{"layout": {"rankSeparationRatio": -1.5}}"#).is_err());
        let config = parse_config(r#"{"layout": {"rankSeparationRatio": 0.5}}"#).unwrap();
        assert_eq!(config.layout.rank_separation_ratio, 0.5);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_config("{ not json").is_err());
    }
}
