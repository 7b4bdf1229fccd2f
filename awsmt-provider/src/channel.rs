//! Channel - CRUD for `awsmt_channel`
//!
//! A channel may carry an IAM policy and a running state on top of its
//! configuration. Outputs, filler slate, time shift and audiences can only be
//! changed while the channel is stopped, so updates of a running channel stop
//! it first and restore the desired state afterwards.

use aws_sdk_mediatailor::Client;
use aws_sdk_mediatailor::operation::describe_channel::DescribeChannelOutput;
use aws_sdk_mediatailor::types::{
    AdMarkupType, DashPlaylistSettings, HlsPlaylistSettings, PlaybackMode, RequestOutputItem,
    ResponseOutputItem, SlateSource, Tier, TimeShiftConfiguration,
};
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State, Value};
use awsmt_core::schema::ResourceSchema;

use crate::convert::{
    Attributes, build_error, get_block, get_blocks, get_i32, get_str, get_string_list,
    insert_block, insert_datetime, insert_int, insert_str,
};
use crate::schemas::channel::{STOP_TO_UPDATE, channel_schema};
use crate::tags::{apply_tag_diff, insert_tags, tags_for_create, tags_from_attributes};
use crate::channel_policy as policy;
use crate::{api_error, deleted, is_not_found};

pub const RUNNING: &str = "RUNNING";
pub const STOPPED: &str = "STOPPED";

/// Start/stop call needed to move a channel between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop,
}

/// Decide which call moves the channel from `current` to `desired`
pub fn transition(current: &str, desired: &str) -> Option<Transition> {
    match (current, desired) {
        (c, RUNNING) if c != RUNNING => Some(Transition::Start),
        (RUNNING, STOPPED) => Some(Transition::Stop),
        _ => None,
    }
}

/// Whether an attribute that can only change on a stopped channel differs
pub fn needs_stop_update(schema: &ResourceSchema, to: &Attributes, from: &Attributes) -> bool {
    STOP_TO_UPDATE.iter().any(|name| {
        schema
            .attributes
            .get(*name)
            .is_some_and(|attr| !attr.matches(to.get(*name), from.get(*name)))
    })
}

// ========== Plan -> API ==========

fn hls_settings_to_api(block: &Attributes) -> ProviderResult<HlsPlaylistSettings> {
    let ad_markup_types = get_string_list(block, "ad_markup_type").map(|types| {
        types
            .iter()
            .map(|t| AdMarkupType::from(t.as_str()))
            .collect()
    });
    Ok(HlsPlaylistSettings::builder()
        .set_manifest_window_seconds(get_i32(block, "manifest_window_seconds")?)
        .set_ad_markup_type(ad_markup_types)
        .build())
}

fn dash_settings_to_api(block: &Attributes) -> ProviderResult<DashPlaylistSettings> {
    Ok(DashPlaylistSettings::builder()
        .set_manifest_window_seconds(get_i32(block, "manifest_window_seconds")?)
        .set_min_buffer_time_seconds(get_i32(block, "min_buffer_time_seconds")?)
        .set_min_update_period_seconds(get_i32(block, "min_update_period_seconds")?)
        .set_suggested_presentation_delay_seconds(get_i32(
            block,
            "suggested_presentation_delay_seconds",
        )?)
        .build())
}

pub fn outputs_to_api(attrs: &Attributes) -> ProviderResult<Vec<RequestOutputItem>> {
    get_blocks(attrs, "outputs")
        .into_iter()
        .map(|output| {
            let hls = get_block(output, "hls_playlist_settings")
                .map(hls_settings_to_api)
                .transpose()?;
            let dash = get_block(output, "dash_playlist_settings")
                .map(dash_settings_to_api)
                .transpose()?;
            RequestOutputItem::builder()
                .set_manifest_name(get_str(output, "manifest_name").map(String::from))
                .set_source_group(get_str(output, "source_group").map(String::from))
                .set_hls_playlist_settings(hls)
                .set_dash_playlist_settings(dash)
                .build()
                .map_err(|e| build_error("output", e))
        })
        .collect()
}

pub fn filler_slate_to_api(attrs: &Attributes) -> Option<SlateSource> {
    get_block(attrs, "filler_slate").map(|block| {
        SlateSource::builder()
            .set_source_location_name(get_str(block, "source_location_name").map(String::from))
            .set_vod_source_name(get_str(block, "vod_source_name").map(String::from))
            .build()
    })
}

pub fn time_shift_to_api(attrs: &Attributes) -> ProviderResult<Option<TimeShiftConfiguration>> {
    get_block(attrs, "time_shift_configuration")
        .map(|block| {
            TimeShiftConfiguration::builder()
                .set_max_time_delay_seconds(get_i32(block, "max_time_delay_seconds")?)
                .build()
                .map_err(|e| build_error("time shift configuration", e))
        })
        .transpose()
}

// ========== API -> State ==========

fn hls_settings_from_api(settings: &HlsPlaylistSettings) -> Attributes {
    let mut block = Attributes::new();
    insert_int(
        &mut block,
        "manifest_window_seconds",
        settings.manifest_window_seconds(),
    );
    if !settings.ad_markup_type().is_empty() {
        block.insert(
            "ad_markup_type".to_string(),
            Value::List(
                settings
                    .ad_markup_type()
                    .iter()
                    .map(|t| Value::string(t.as_str()))
                    .collect(),
            ),
        );
    }
    block
}

fn dash_settings_from_api(settings: &DashPlaylistSettings) -> Attributes {
    let mut block = Attributes::new();
    insert_int(
        &mut block,
        "manifest_window_seconds",
        settings.manifest_window_seconds(),
    );
    insert_int(
        &mut block,
        "min_buffer_time_seconds",
        settings.min_buffer_time_seconds(),
    );
    insert_int(
        &mut block,
        "min_update_period_seconds",
        settings.min_update_period_seconds(),
    );
    insert_int(
        &mut block,
        "suggested_presentation_delay_seconds",
        settings.suggested_presentation_delay_seconds(),
    );
    block
}

pub fn outputs_from_api(outputs: &[ResponseOutputItem]) -> Value {
    Value::List(
        outputs
            .iter()
            .map(|output| {
                let mut block = Attributes::new();
                block.insert(
                    "manifest_name".to_string(),
                    Value::string(output.manifest_name()),
                );
                block.insert(
                    "source_group".to_string(),
                    Value::string(output.source_group()),
                );
                block.insert(
                    "playback_url".to_string(),
                    Value::string(output.playback_url()),
                );
                if let Some(hls) = output.hls_playlist_settings() {
                    insert_block(&mut block, "hls_playlist_settings", hls_settings_from_api(hls));
                }
                if let Some(dash) = output.dash_playlist_settings() {
                    insert_block(
                        &mut block,
                        "dash_playlist_settings",
                        dash_settings_from_api(dash),
                    );
                }
                Value::Map(block)
            })
            .collect(),
    )
}

pub fn filler_slate_from_api(slate: &SlateSource) -> Attributes {
    let mut block = Attributes::new();
    insert_str(
        &mut block,
        "source_location_name",
        slate.source_location_name(),
    );
    insert_str(&mut block, "vod_source_name", slate.vod_source_name());
    block
}

fn channel_from_api(out: &DescribeChannelOutput, channel_policy: Option<&str>) -> Attributes {
    let mut attrs = Attributes::new();
    insert_str(&mut attrs, "channel_name", out.channel_name());
    insert_str(&mut attrs, "arn", out.arn());
    insert_str(
        &mut attrs,
        "channel_state",
        out.channel_state().map(|s| s.as_str()),
    );
    insert_str(&mut attrs, "playback_mode", out.playback_mode());
    insert_str(&mut attrs, "tier", out.tier());
    attrs.insert("outputs".to_string(), outputs_from_api(out.outputs()));
    if let Some(slate) = out.filler_slate() {
        insert_block(&mut attrs, "filler_slate", filler_slate_from_api(slate));
    }
    if let Some(time_shift) = out.time_shift_configuration() {
        let mut block = Attributes::new();
        insert_int(
            &mut block,
            "max_time_delay_seconds",
            Some(time_shift.max_time_delay_seconds()),
        );
        insert_block(&mut attrs, "time_shift_configuration", block);
    }
    if !out.audiences().is_empty() {
        attrs.insert(
            "audiences".to_string(),
            Value::List(out.audiences().iter().map(Value::string).collect()),
        );
    }
    insert_str(&mut attrs, "policy", channel_policy);
    insert_tags(&mut attrs, out.tags());
    insert_datetime(&mut attrs, "creation_time", out.creation_time());
    insert_datetime(&mut attrs, "last_modified_time", out.last_modified_time());
    attrs
}

// ========== Operations ==========

pub async fn read(client: &Client, id: &ResourceId, channel_name: &str) -> ProviderResult<State> {
    log::debug!("DescribeChannel {}", channel_name);
    let out = match client
        .describe_channel()
        .channel_name(channel_name)
        .send()
        .await
    {
        Ok(out) => out,
        Err(err) if is_not_found(&err) => return Ok(State::not_found(id.clone())),
        Err(err) => {
            return Err(api_error("describe channel", err).for_resource(id.clone()));
        }
    };

    let channel_policy = policy::get(client, channel_name)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    Ok(
        State::existing(id.clone(), channel_from_api(&out, channel_policy.as_deref()))
            .with_identifier(channel_name),
    )
}

pub async fn create(client: &Client, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let channel_name = get_str(attrs, "channel_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "channel_name"))?;

    let outputs = outputs_to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;
    let time_shift = time_shift_to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

    log::info!("Creating channel {}", channel_name);
    client
        .create_channel()
        .channel_name(channel_name)
        .set_playback_mode(get_str(attrs, "playback_mode").map(PlaybackMode::from))
        .set_outputs(Some(outputs))
        .set_filler_slate(filler_slate_to_api(attrs))
        .set_tier(get_str(attrs, "tier").map(Tier::from))
        .set_time_shift_configuration(time_shift)
        .set_audiences(get_string_list(attrs, "audiences"))
        .set_tags(tags_for_create(attrs))
        .send()
        .await
        .map_err(|e| api_error("create channel", e).for_resource(id.clone()))?;

    if let Some(document) = get_str(attrs, "policy") {
        policy::put(client, channel_name, document)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    if get_str(attrs, "channel_state") == Some(RUNNING) {
        start(client, channel_name)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    read(client, id, channel_name).await
}

pub async fn update(
    client: &Client,
    id: &ResourceId,
    channel_name: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let attrs = &to.attributes;
    let schema = channel_schema();
    let mut current_state = from.get_str("channel_state").unwrap_or(STOPPED).to_string();

    if needs_stop_update(&schema, attrs, &from.attributes) {
        if current_state == RUNNING {
            stop(client, channel_name)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;
            current_state = STOPPED.to_string();
        }

        let outputs = outputs_to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;
        let time_shift = time_shift_to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

        log::info!("Updating channel {}", channel_name);
        client
            .update_channel()
            .channel_name(channel_name)
            .set_outputs(Some(outputs))
            .set_filler_slate(filler_slate_to_api(attrs))
            .set_time_shift_configuration(time_shift)
            .set_audiences(get_string_list(attrs, "audiences"))
            .send()
            .await
            .map_err(|e| api_error("update channel", e).for_resource(id.clone()))?;
    }

    if let Some(arn) = from.get_str("arn") {
        apply_tag_diff(
            client,
            arn,
            &tags_from_attributes(&from.attributes),
            &tags_from_attributes(attrs),
        )
        .await
        .map_err(|e| e.for_resource(id.clone()))?;
    }

    match policy::action(get_str(attrs, "policy"), from.get_str("policy")) {
        policy::Action::Put(document) => policy::put(client, channel_name, document).await,
        policy::Action::Delete => policy::delete(client, channel_name).await,
        policy::Action::Keep => Ok(()),
    }
    .map_err(|e| e.for_resource(id.clone()))?;

    // Unset means "keep what it was", which also restores a channel stopped above
    let desired_state = get_str(attrs, "channel_state")
        .or(from.get_str("channel_state"))
        .unwrap_or(STOPPED);
    match transition(&current_state, desired_state) {
        Some(Transition::Start) => start(client, channel_name).await,
        Some(Transition::Stop) => stop(client, channel_name).await,
        None => Ok(()),
    }
    .map_err(|e| e.for_resource(id.clone()))?;

    read(client, id, channel_name).await
}

pub async fn delete(client: &Client, id: &ResourceId, channel_name: &str) -> ProviderResult<()> {
    let current = read(client, id, channel_name).await?;
    if !current.exists {
        log::warn!("Channel {} is already gone", channel_name);
        return Ok(());
    }

    if current.get_str("channel_state") == Some(RUNNING) {
        stop(client, channel_name)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    if current.get_str("policy").is_some() {
        policy::delete(client, channel_name)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    log::info!("Deleting channel {}", channel_name);
    let result = client.delete_channel().channel_name(channel_name).send().await;
    deleted("delete channel", result).map_err(|e| e.for_resource(id.clone()))
}

async fn start(client: &Client, channel_name: &str) -> ProviderResult<()> {
    log::info!("Starting channel {}", channel_name);
    client
        .start_channel()
        .channel_name(channel_name)
        .send()
        .await
        .map_err(|e| api_error("start channel", e))?;
    Ok(())
}

async fn stop(client: &Client, channel_name: &str) -> ProviderResult<()> {
    log::info!("Stopping channel {}", channel_name);
    client
        .stop_channel()
        .channel_name(channel_name)
        .send()
        .await
        .map_err(|e| api_error("stop channel", e))?;
    Ok(())
}
