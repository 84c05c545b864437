use serde::{Deserialize, Serialize};

/// Colours and typography of the SVG preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_fill: String,
    pub node_border: String,
    pub node_text_color: String,
    pub line_color: String,
    pub marker_fill: String,
    pub draft_fill: String,
    pub draft_border: String,
    pub comment_text_color: String,
    pub edge_label_background: String,
    pub error_color: String,
    pub background: String,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_fill: "#F8FAFF".to_string(),
            node_border: "#C7D2E5".to_string(),
            node_text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            marker_fill: "#7A8AA6".to_string(),
            draft_fill: "#FFFFFF".to_string(),
            draft_border: "#A9B6CC".to_string(),
            comment_text_color: "#5B6B85".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            error_color: "#D64545".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            node_fill: "#ECECFF".to_string(),
            node_border: "#9370DB".to_string(),
            node_text_color: "#333333".to_string(),
            line_color: "#333333".to_string(),
            marker_fill: "#333333".to_string(),
            draft_fill: "#FFFFDE".to_string(),
            draft_border: "#AAAA33".to_string(),
            comment_text_color: "#666666".to_string(),
            edge_label_background: "#E8E8E8".to_string(),
            error_color: "#CC0000".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" => Some(Self::classic()),
            _ => None,
        }
    }
}
