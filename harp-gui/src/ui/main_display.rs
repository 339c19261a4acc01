//! # Main Display Module
//!
//! Layout of the trainer window: selection controls and the current lick on
//! the left, the practice sidebar on the right.

use harp_core::timeline::{BPM_MAX, BPM_MIN};
use harp_core::{PlaybackState, Register};
use iced::widget::{
    Space, button, checkbox, column, container, horizontal_space, pick_list, row, slider, text,
};
use iced::{Alignment, Color, Element, Length};

use super::harp_holes::HarpHoles;
use crate::{AppDisplayData, Message};

/// Configuration for a single button in the sidebar
#[derive(Debug, Clone)]
struct ButtonConfig {
    label: &'static str,
    message: Message,
    button_type: ButtonType,
}

#[derive(Debug, Clone)]
enum ButtonType {
    Standard,
    /// Red while playback is running
    Transport,
}

const SIDEBAR_CONFIG: &[(&str, &[ButtonConfig])] = &[
    ("Practice", &[
        ButtonConfig { label: "New lick", message: Message::NewLick, button_type: ButtonType::Standard },
        ButtonConfig { label: "Play again", message: Message::Play, button_type: ButtonType::Standard },
        ButtonConfig { label: "Stop", message: Message::Stop, button_type: ButtonType::Transport },
        ButtonConfig { label: "Play scale", message: Message::PlayScale, button_type: ButtonType::Standard },
        ButtonConfig { label: "Show / hide tabs", message: Message::ToggleTabs, button_type: ButtonType::Standard },
    ]),
    ("Program", &[
        ButtonConfig { label: "Save settings", message: Message::SaveSettings, button_type: ButtonType::Standard },
    ]),
];

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    let title = text("Harp Ear Trainer").size(28);

    let main_content = row![
        column![
            title,
            Space::with_height(20),
            create_selection_panel(data),
            Space::with_height(10),
            create_lick_panel(data),
            Space::with_height(Length::Fill),
            create_status_line(data),
        ]
        .width(Length::Fill)
        .spacing(10),
        Space::with_width(10),
        create_sidebar(data.playback_state),
    ]
    .align_y(Alignment::Start)
    .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Key, scale, register, tempo and mode controls.
fn create_selection_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let scale = if data.scales.iter().any(|s| *s == data.scale) {
        Some(data.scale.clone())
    } else {
        None
    };

    let pickers = row![
        labelled("Harp key", pick_list(data.keys.clone(), Some(data.key), Message::KeySelected).into()),
        labelled("Scale", pick_list(data.scales.clone(), scale, Message::ScaleSelected).into()),
        labelled(
            "Register",
            pick_list(Register::ALL, Some(data.register), Message::RegisterSelected).into()
        ),
    ]
    .spacing(20)
    .align_y(Alignment::End);

    let available = if data.registers_available.is_empty() {
        "No licks for this key and scale".to_string()
    } else {
        let names: Vec<String> = data.registers_available.iter().map(Register::to_string).collect();
        format!("Registers with licks: {}", names.join(", "))
    };

    let tempo = row![
        text(format!("{:.0} BPM", data.bpm)).size(16).width(Length::Fixed(90.0)),
        slider(BPM_MIN..=BPM_MAX, data.bpm, Message::BpmChanged).step(1.0),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let modes = row![
        checkbox("Call and response", data.call_and_response).on_toggle(Message::CallAndResponseToggled),
        checkbox("New lick every cycle", data.reselect).on_toggle(Message::ReselectToggled),
    ]
    .spacing(20);

    container(
        column![
            text("Selection").size(18),
            Space::with_height(10),
            pickers,
            text(available).size(12),
            tempo,
            modes,
        ]
        .spacing(10)
        .padding(15),
    )
    .width(Length::Fill)
    .into()
}

/// The current lick: label, tablature and the hole display.
fn create_lick_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let label = data
        .lick_label
        .clone()
        .unwrap_or_else(|| "Press \"New lick\" to start".to_string());

    let sounding = data
        .sounding
        .filter(|_| data.tabs_visible)
        .and_then(|index| data.lick_tabs.get(index).copied().flatten());

    let progress = match (data.playback_state, data.sounding, data.response_beat) {
        (PlaybackState::Playing, Some(index), _) => {
            format!("Listening: note {} of {}", index + 1, data.lick_tabs.len())
        }
        (PlaybackState::CallAndResponseWaiting, _, Some(beat)) => format!("Your turn: beat {}", beat + 1),
        (PlaybackState::Idle, _, _) => String::new(),
        _ => "Listening".to_string(),
    };
    let cycle = if data.call_and_response && data.playback_state != PlaybackState::Idle {
        format!("Cycle {}", data.iteration + 1)
    } else {
        String::new()
    };

    container(
        column![
            row![text("Lick").size(18), horizontal_space(), text(cycle).size(14)],
            text(label).size(14),
            Space::with_height(10),
            text(data.tab_text.clone()).size(32),
            Space::with_height(10),
            HarpHoles::new(sounding).view(),
            text(progress).size(16),
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .into()
}

fn create_status_line(data: &AppDisplayData) -> Element<'static, Message> {
    let status = data.status.clone().unwrap_or_default();
    text(status)
        .size(14)
        .color(Color::from_rgb(1.0, 0.84, 0.0))
        .into()
}

fn labelled(label: &'static str, control: Element<'static, Message>) -> Element<'static, Message> {
    column![text(label).size(14), control].spacing(5).into()
}

fn create_sidebar(state: PlaybackState) -> Element<'static, Message> {
    let playing = state != PlaybackState::Idle;
    let sections = SIDEBAR_CONFIG
        .iter()
        .fold(column![].spacing(10), |col, &(title, buttons)| {
            col.push(make_section(title, buttons, playing))
        });

    container(sections.padding(15))
        .width(Length::Fixed(220.0))
        .height(Length::Fill)
        .into()
}

fn make_section(
    title: &'static str,
    buttons: &[ButtonConfig],
    playing: bool,
) -> Element<'static, Message> {
    let items = buttons
        .iter()
        .fold(column![].spacing(8), |col, config| col.push(make_button(config, playing)));

    column![text(title).size(18), Space::with_height(10), items]
        .spacing(5)
        .into()
}

fn make_button(config: &ButtonConfig, playing: bool) -> Element<'static, Message> {
    let mut button = button(text(config.label).size(14).width(Length::Fill)).padding([6, 10]);

    if let ButtonType::Transport = config.button_type {
        if playing {
            button = button.style(|_theme, _status| {
                use iced::widget::button;
                button::Style {
                    background: Some(iced::Background::Color(Color::from_rgb(0.8, 0.2, 0.2))),
                    text_color: Color::WHITE,
                    ..button::Style::default()
                }
            });
        }
    }

    button.on_press(config.message.clone()).into()
}
