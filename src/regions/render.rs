use serde::Serialize;

use crate::models::Region;

use super::geometry::Rect;

const REGION_LINE_WIDTH: f64 = 3.0;
const PROVISIONAL_LINE_WIDTH: f64 = 2.0;
const PROVISIONAL_COLOR: &str = "#ffffff";
const PROVISIONAL_DASH: [f64; 2] = [5.0, 5.0];
const LABEL_FONT: &str = "bold 16px Inter, sans-serif";
const LABEL_OFFSET_Y: f64 = 8.0;

/// One drawing instruction for the overlay canvas, in source-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DrawCommand {
    Clear,
    #[serde(rename_all = "camelCase")]
    StrokeRect {
        rect: Rect,
        color: String,
        line_width: f64,
        dash: Option<[f64; 2]>,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        color: String,
        font: String,
    },
}

/// Full redraw of the overlay: clear, every region with its label, then the
/// provisional drag rectangle on top.
pub fn render(regions: &[Region], provisional: Option<&Rect>) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(regions.len() * 2 + 2);
    commands.push(DrawCommand::Clear);

    for region in regions {
        commands.push(DrawCommand::StrokeRect {
            rect: region.rect(),
            color: region.color.clone(),
            line_width: REGION_LINE_WIDTH,
            dash: None,
        });
        commands.push(DrawCommand::FillText {
            text: region.label.clone(),
            x: region.x,
            y: region.y - LABEL_OFFSET_Y,
            color: region.color.clone(),
            font: LABEL_FONT.to_string(),
        });
    }

    if let Some(rect) = provisional {
        commands.push(DrawCommand::StrokeRect {
            rect: *rect,
            color: PROVISIONAL_COLOR.to_string(),
            line_width: PROVISIONAL_LINE_WIDTH,
            dash: Some(PROVISIONAL_DASH),
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(label: &str, color: &str) -> Region {
        Region {
            id: label.to_lowercase(),
            x: 40.0,
            y: 30.0,
            width: 100.0,
            height: 50.0,
            color: color.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn empty_state_only_clears() {
        assert_eq!(render(&[], None), vec![DrawCommand::Clear]);
    }

    #[test]
    fn regions_draw_outline_then_label_above() {
        let commands = render(&[region("Region 1", "#ff6b6b")], None);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], DrawCommand::Clear);
        match &commands[1] {
            DrawCommand::StrokeRect { color, dash, line_width, .. } => {
                assert_eq!(color, "#ff6b6b");
                assert_eq!(*dash, None);
                assert_eq!(*line_width, 3.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &commands[2] {
            DrawCommand::FillText { text, x, y, .. } => {
                assert_eq!(text, "Region 1");
                assert_eq!((*x, *y), (40.0, 22.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn provisional_rect_is_dashed_and_last() {
        let rect = Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        };
        let commands = render(&[region("A", "#4ecdc4")], Some(&rect));
        match commands.last() {
            Some(DrawCommand::StrokeRect { rect: drawn, color, dash, .. }) => {
                assert_eq!(*drawn, rect);
                assert_eq!(color, "#ffffff");
                assert_eq!(*dash, Some([5.0, 5.0]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
