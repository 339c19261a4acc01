//! # Harp Holes Widget
//!
//! Draws the ten holes of a diatonic harmonica, blow notes on the top row and
//! draw notes on the bottom row, and lights up the tab that is sounding.

use harp_core::harp::Breath;
use harp_core::Tab;
use iced::alignment;
use iced::widget::canvas::{self, Fill, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Pixels, Point, Rectangle, Renderer, Size, Theme, mouse};

const HOLE_COUNT: usize = 10;
const ROW_LABEL_WIDTH: f32 = 48.0;

const SOUNDING: Color = Color { r: 0.20, g: 0.86, b: 0.60, a: 1.0 };
const BENT: Color = Color { r: 1.0, g: 0.84, b: 0.0, a: 1.0 };
const CELL: Color = Color { r: 0.18, g: 0.18, b: 0.20, a: 1.0 };

#[derive(Debug, Clone)]
pub struct HarpHoles {
    /// Tab to highlight; `None` while nothing sounds or tabs are hidden
    sounding: Option<Tab>,
}

impl HarpHoles {
    pub fn new(sounding: Option<Tab>) -> Self {
        Self { sounding }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(110.0)),
        )
        .into()
    }

    fn highlight(&self, hole: u8, breath: Breath) -> Option<Color> {
        let tab = self.sounding?;
        if tab.hole != hole || tab.breath != breath {
            return None;
        }
        Some(if tab.bend > 0 { BENT } else { SOUNDING })
    }
}

impl canvas::Program<crate::Message> for HarpHoles {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let hole_width = (bounds.width - ROW_LABEL_WIDTH) / HOLE_COUNT as f32;
        let row_height = bounds.height / 3.0;

        // Hole numbers across the middle, blow above, draw below
        let rows = [(Breath::Blow, 0.0, "blow"), (Breath::Draw, 2.0 * row_height, "draw")];
        for (breath, y, label) in rows {
            frame.fill_text(canvas::Text {
                content: label.to_string(),
                position: Point::new(4.0, y + row_height / 2.0),
                color: Color::from_rgb(0.6, 0.6, 0.6),
                size: Pixels(14.0),
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });

            for hole in 1..=HOLE_COUNT as u8 {
                let x = ROW_LABEL_WIDTH + (hole - 1) as f32 * hole_width;
                let origin = Point::new(x + 2.0, y + 2.0);
                let size = Size::new(hole_width - 4.0, row_height - 4.0);
                let color = self.highlight(hole, breath).unwrap_or(CELL);
                frame.fill_rectangle(origin, size, Fill::from(color));
                frame.stroke(
                    &Path::rectangle(origin, size),
                    Stroke::default().with_color(Color::from_rgb(0.35, 0.35, 0.38)),
                );
            }
        }

        for hole in 1..=HOLE_COUNT {
            let x = ROW_LABEL_WIDTH + (hole as f32 - 0.5) * hole_width;
            frame.fill_text(canvas::Text {
                content: hole.to_string(),
                position: Point::new(x, row_height * 1.5),
                color: Color::WHITE,
                size: Pixels(16.0),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
        }

        // Name the bend on the lit draw hole
        if let Some(tab) = self.sounding.filter(|t| t.bend > 0) {
            let x = ROW_LABEL_WIDTH + (tab.hole as f32 - 0.5) * hole_width;
            frame.fill_text(canvas::Text {
                content: "'".repeat(tab.bend as usize),
                position: Point::new(x, row_height * 2.5),
                color: Color::BLACK,
                size: Pixels(18.0),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}
