//! Rendering of panel embeds, buttons, pickers and modals.

use std::collections::HashMap;

use {
    serenity::all::{
        ActionRow, ActionRowComponent, ButtonStyle, ChannelId, CreateActionRow, CreateButton,
        CreateEmbed, CreateEmbedFooter, CreateInputText, CreateInteractionResponse,
        CreateInteractionResponseMessage, CreateMessage, CreateModal, CreateSelectMenu,
        CreateSelectMenuKind, InputTextStyle, Timestamp,
    },
    tempvoice_config::PanelConfig,
    tempvoice_rooms::{ControlPanel, Form, Localizer, PanelAction, Picker, Reply},
};

/// Panel layout: rows of `(action, style)`.
const PANEL_ROWS: &[&[(PanelAction, ButtonStyle)]] = &[
    &[
        (PanelAction::Hide, ButtonStyle::Primary),
        (PanelAction::Unhide, ButtonStyle::Secondary),
        (PanelAction::Rename, ButtonStyle::Success),
        (PanelAction::Lock, ButtonStyle::Danger),
        (PanelAction::Unlock, ButtonStyle::Secondary),
    ],
    &[
        (PanelAction::SetLimit, ButtonStyle::Primary),
        (PanelAction::AddMember, ButtonStyle::Success),
        (PanelAction::RemoveMember, ButtonStyle::Danger),
        (PanelAction::Blacklist, ButtonStyle::Danger),
    ],
    &[
        (PanelAction::Delete, ButtonStyle::Danger),
        (PanelAction::TransferOwnership, ButtonStyle::Primary),
    ],
];

/// The embed and button grid posted into a new text channel.
pub fn control_panel(locale: &Localizer, config: &PanelConfig, panel: &ControlPanel) -> CreateMessage {
    let mut embed = CreateEmbed::new()
        .title(locale.get("controlPanel.title"))
        .description(locale.get("controlPanel.description"))
        .color(config.color)
        .field(
            locale.get("controlPanel.channelNameField"),
            &panel.channel_name,
            true,
        )
        .field(
            locale.get("controlPanel.channelIdField"),
            panel.voice_channel_id.to_string(),
            true,
        )
        .footer(CreateEmbedFooter::new(locale.format(
            "controlPanel.ownerFooter",
            &[("user", &panel.owner.tag)],
        )))
        .timestamp(Timestamp::now());
    if let Some(image) = &config.image_url {
        embed = embed.image(image);
    }
    if let Some(avatar) = &panel.owner.avatar_url {
        embed = embed.thumbnail(avatar);
    }

    CreateMessage::new()
        .embed(embed)
        .components(panel_rows(locale, panel.voice_channel_id))
}

pub fn panel_rows(locale: &Localizer, channel_id: ChannelId) -> Vec<CreateActionRow> {
    PANEL_ROWS
        .iter()
        .map(|row| {
            CreateActionRow::Buttons(
                row.iter()
                    .map(|(action, style)| {
                        button(
                            *action,
                            *style,
                            locale.get(&format!("buttons.{}", action.as_str())),
                            channel_id,
                        )
                    })
                    .collect(),
            )
        })
        .collect()
}

fn button(action: PanelAction, style: ButtonStyle, label: String, channel_id: ChannelId) -> CreateButton {
    CreateButton::new(action.custom_id(channel_id))
        .label(label)
        .style(style)
}

pub fn form(locale: &Localizer, form: Form, channel_id: ChannelId) -> CreateModal {
    let (title, label, placeholder, max_length) = match form {
        Form::Rename => (
            "modals.renameTitle",
            "modals.renameLabel",
            "modals.renamePlaceholder",
            100,
        ),
        Form::Limit => (
            "modals.setLimitTitle",
            "modals.setLimitLabel",
            "modals.setLimitPlaceholder",
            2,
        ),
    };
    let input = CreateInputText::new(InputTextStyle::Short, locale.get(label), form.field_id())
        .placeholder(locale.get(placeholder))
        .min_length(1)
        .max_length(max_length)
        .required(true);
    CreateModal::new(form.custom_id(channel_id), locale.get(title))
        .components(vec![CreateActionRow::InputText(input)])
}

pub fn picker(locale: &Localizer, picker: Picker, channel_id: ChannelId) -> CreateInteractionResponseMessage {
    let section = picker.locale_section();
    let menu = CreateSelectMenu::new(
        picker.custom_id(channel_id),
        CreateSelectMenuKind::User {
            default_users: None,
        },
    )
    .placeholder(locale.get(&format!("{section}.selectUserPlaceholder")))
    .min_values(1)
    .max_values(picker.max_values());

    CreateInteractionResponseMessage::new()
        .content(locale.get(&format!("{section}.selectUserPrompt")))
        .components(vec![CreateActionRow::SelectMenu(menu)])
        .ephemeral(true)
}

pub fn confirm_delete(locale: &Localizer, channel_id: ChannelId) -> CreateInteractionResponseMessage {
    let embed = CreateEmbed::new()
        .title(locale.get("deleteConfirmation.title"))
        .description(locale.get("deleteConfirmation.prompt"));
    let buttons = CreateActionRow::Buttons(vec![
        button(
            PanelAction::ConfirmDelete,
            ButtonStyle::Danger,
            locale.get("deleteConfirmation.confirmDelete"),
            channel_id,
        ),
        button(
            PanelAction::CancelDelete,
            ButtonStyle::Secondary,
            locale.get("deleteConfirmation.cancelDelete"),
            channel_id,
        ),
    ]);
    CreateInteractionResponseMessage::new()
        .embed(embed)
        .components(vec![buttons])
        .ephemeral(true)
}

pub fn ephemeral(content: impl Into<String>) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

/// Turn a dispatcher reply into an interaction response.
pub fn response(locale: &Localizer, reply: Reply) -> CreateInteractionResponse {
    match reply {
        Reply::Message(text) => ephemeral(text),
        Reply::Form { form: f, channel_id } => CreateInteractionResponse::Modal(form(locale, f, channel_id)),
        Reply::Picker {
            picker: p,
            channel_id,
        } => CreateInteractionResponse::Message(picker(locale, p, channel_id)),
        Reply::ConfirmDelete { channel_id } => {
            CreateInteractionResponse::Message(confirm_delete(locale, channel_id))
        },
    }
}

/// Text-input values of a submitted modal, keyed by input custom id.
pub fn modal_fields(rows: &[ActionRow]) -> HashMap<String, String> {
    collect_fields(rows.iter().flat_map(|row| &row.components).filter_map(
        |component| match component {
            ActionRowComponent::InputText(input) => {
                Some((input.custom_id.as_str(), input.value.as_deref()))
            },
            _ => None,
        },
    ))
}

fn collect_fields<'a>(inputs: impl Iterator<Item = (&'a str, Option<&'a str>)>) -> HashMap<String, String> {
    inputs
        .map(|(id, value)| (id.to_string(), value.unwrap_or_default().to_string()))
        .collect()
}
