use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed size table of the flow layout. Every dimension is in diagram units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub node_border: f32,
    pub gap_x: f32,
    pub gap_y: f32,
    /// Extra height for nodes that show a binding/type label.
    pub label_height: f32,
    pub label_width: f32,
    pub if_node_width: f32,
    pub while_node_width: f32,
    pub empty_node_width: f32,
    pub empty_node_container_width: f32,
    pub end_node_width: f32,
    pub comment_node_width: f32,
    pub button_node_height: f32,
    pub prompt_node_width: f32,
    pub prompt_node_height: f32,
    pub agent: AgentLayoutConfig,
    pub canvas_padding: f32,
    /// Y of the first root node.
    pub start_y: f32,
    pub error_handlers: ErrorHandlerConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 280.0,
            node_height: 50.0,
            node_border: 1.5,
            gap_x: 60.0,
            gap_y: 50.0,
            label_height: 20.0,
            label_width: 100.0,
            if_node_width: 65.0,
            while_node_width: 52.0,
            empty_node_width: 16.0,
            empty_node_container_width: 280.0,
            end_node_width: 20.0,
            comment_node_width: 200.0,
            button_node_height: 20.0,
            prompt_node_width: 280.0,
            prompt_node_height: 300.0,
            agent: AgentLayoutConfig::default(),
            canvas_padding: 40.0,
            start_y: 50.0,
            error_handlers: ErrorHandlerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLayoutConfig {
    pub tool_gap: f32,
    pub tool_section_gap: f32,
    pub add_tool_button_width: f32,
}

impl Default for AgentLayoutConfig {
    fn default() -> Self {
        Self {
            tool_gap: 10.0,
            tool_section_gap: 20.0,
            add_tool_button_width: 16.0,
        }
    }
}

/// Error handlers can be drawn collapsed, in which case only the protected
/// body is laid out and the failure region is hidden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHandlerConfig {
    pub collapse: bool,
    /// Id of the one handler kept expanded while collapsing the rest.
    pub expanded: Option<String>,
}

impl ErrorHandlerConfig {
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapse && self.expanded.as_deref() != Some(id)
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
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_fill: Option<String>,
    node_border: Option<String>,
    node_text_color: Option<String>,
    line_color: Option<String>,
    marker_fill: Option<String>,
    error_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOverrides {
    node_width: Option<f32>,
    node_height: Option<f32>,
    node_border: Option<f32>,
    gap_x: Option<f32>,
    gap_y: Option<f32>,
    label_height: Option<f32>,
    label_width: Option<f32>,
    if_node_width: Option<f32>,
    while_node_width: Option<f32>,
    empty_node_width: Option<f32>,
    end_node_width: Option<f32>,
    comment_node_width: Option<f32>,
    button_node_height: Option<f32>,
    prompt_node_width: Option<f32>,
    prompt_node_height: Option<f32>,
    agent: Option<AgentOverrides>,
    canvas_padding: Option<f32>,
    start_y: Option<f32>,
    collapse_error_handlers: Option<bool>,
    expanded_error_handler: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentOverrides {
    tool_gap: Option<f32>,
    tool_section_gap: Option<f32>,
    add_tool_button_width: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOverrides {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutOverrides>,
    render: Option<RenderOverrides>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(&contents).map_err(|_| {
            anyhow::anyhow!("invalid config {}: {json_err}", path.display())
        })?,
    };
    Ok(apply_config_file(parsed))
}

fn apply_config_file(parsed: ConfigFile) -> Config {
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::by_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme, keeping default"),
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
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.node_text_color {
            config.theme.node_text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.marker_fill {
            config.theme.marker_fill = v;
        }
        if let Some(v) = vars.error_color {
            config.theme.error_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.node_width {
            target.node_width = v;
            target.empty_node_container_width = v;
        }
        if let Some(v) = layout.node_height {
            target.node_height = v;
        }
        if let Some(v) = layout.node_border {
            target.node_border = v;
        }
        if let Some(v) = layout.gap_x {
            target.gap_x = v;
        }
        if let Some(v) = layout.gap_y {
            target.gap_y = v;
            target.start_y = v;
        }
        if let Some(v) = layout.label_height {
            target.label_height = v;
        }
        if let Some(v) = layout.label_width {
            target.label_width = v;
        }
        if let Some(v) = layout.if_node_width {
            target.if_node_width = v;
        }
        if let Some(v) = layout.while_node_width {
            target.while_node_width = v;
        }
        if let Some(v) = layout.empty_node_width {
            target.empty_node_width = v;
        }
        if let Some(v) = layout.end_node_width {
            target.end_node_width = v;
        }
        if let Some(v) = layout.comment_node_width {
            target.comment_node_width = v;
        }
        if let Some(v) = layout.button_node_height {
            target.button_node_height = v;
        }
        if let Some(v) = layout.prompt_node_width {
            target.prompt_node_width = v;
        }
        if let Some(v) = layout.prompt_node_height {
            target.prompt_node_height = v;
        }
        if let Some(agent) = layout.agent {
            if let Some(v) = agent.tool_gap {
                target.agent.tool_gap = v;
            }
            if let Some(v) = agent.tool_section_gap {
                target.agent.tool_section_gap = v;
            }
            if let Some(v) = agent.add_tool_button_width {
                target.agent.add_tool_button_width = v;
            }
        }
        if let Some(v) = layout.canvas_padding {
            target.canvas_padding = v;
        }
        if let Some(v) = layout.start_y {
            target.start_y = v;
        }
        if let Some(v) = layout.collapse_error_handlers {
            target.error_handlers.collapse = v;
        }
        if layout.expanded_error_handler.is_some() {
            target.error_handlers.expanded = layout.expanded_error_handler;
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

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("flow-diagram-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.node_width, 280.0);
        assert!(!config.layout.error_handlers.collapse);
    }

    #[test]
    fn overrides_merge_into_defaults() {
        let path = write_temp(
            "overrides.json",
            r#"{"theme":"classic","layout":{"gapY":40,"collapseErrorHandlers":true,"expandedErrorHandler":"eh-1"}}"#,
        );
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.layout.gap_y, 40.0);
        assert_eq!(config.layout.start_y, 40.0);
        assert_eq!(config.layout.gap_x, 60.0);
        assert_eq!(config.theme.node_border, Theme::classic().node_border);
        assert!(config.layout.error_handlers.is_collapsed("eh-2"));
        assert!(!config.layout.error_handlers.is_collapsed("eh-1"));
    }

    #[test]
    fn every_size_constant_can_be_overridden() {
        let path = write_temp(
            "sizes.json",
            r#"{"layout":{"nodeBorder":2,"labelWidth":120,"emptyNodeWidth":12,"endNodeWidth":24,
                "buttonNodeHeight":18,"agent":{"toolGap":6,"addToolButtonWidth":20}}}"#,
        );
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        let layout = &config.layout;
        assert_eq!(layout.node_border, 2.0);
        assert_eq!(layout.label_width, 120.0);
        assert_eq!(layout.empty_node_width, 12.0);
        assert_eq!(layout.end_node_width, 24.0);
        assert_eq!(layout.button_node_height, 18.0);
        assert_eq!(layout.agent.tool_gap, 6.0);
        assert_eq!(layout.agent.add_tool_button_width, 20.0);
        assert_eq!(layout.agent.tool_section_gap, 20.0);
    }

    #[test]
    fn json5_config_is_accepted() {
        let path = write_temp("overrides.json5", "{ layout: { gapX: 30, }, // trailing\n }");
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.layout.gap_x, 30.0);
    }
}
