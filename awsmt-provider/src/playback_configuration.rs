//! Playback configuration - CRUD for `awsmt_playback_configuration`
//!
//! PutPlaybackConfiguration both creates and replaces the whole configuration.
//! Log sampling is configured with a separate call.

use std::collections::HashMap;

use aws_sdk_mediatailor::Client;
use aws_sdk_mediatailor::operation::get_playback_configuration::GetPlaybackConfigurationOutput;
use aws_sdk_mediatailor::types::{
    AdMarkerPassthrough, AvailSuppression, Bumper, CdnConfiguration, DashConfiguration,
    DashConfigurationForPut, FillPolicy, LivePreRollConfiguration, ManifestProcessingRules, Mode,
    OriginManifestType,
};
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State, Value};

use crate::convert::{
    Attributes, get_block, get_bool, get_i32, get_str, insert_block, insert_int, insert_str,
    string_map_value, to_string_map,
};
use crate::tags::{apply_tag_diff, insert_tags, tags_for_create, tags_from_attributes};
use crate::{api_error, deleted, is_not_found};

const PERCENT_ENABLED: &str = "log_configuration_percent_enabled";

// ========== Plan -> API ==========

pub fn avail_suppression_to_api(block: &Attributes) -> AvailSuppression {
    AvailSuppression::builder()
        .set_mode(get_str(block, "mode").map(Mode::from))
        .set_value(get_str(block, "value").map(String::from))
        .set_fill_policy(get_str(block, "fill_policy").map(FillPolicy::from))
        .build()
}

pub fn bumper_to_api(block: &Attributes) -> Bumper {
    Bumper::builder()
        .set_start_url(get_str(block, "start_url").map(String::from))
        .set_end_url(get_str(block, "end_url").map(String::from))
        .build()
}

pub fn cdn_configuration_to_api(block: &Attributes) -> CdnConfiguration {
    CdnConfiguration::builder()
        .set_ad_segment_url_prefix(get_str(block, "ad_segment_url_prefix").map(String::from))
        .set_content_segment_url_prefix(
            get_str(block, "content_segment_url_prefix").map(String::from),
        )
        .build()
}

pub fn dash_configuration_to_api(block: &Attributes) -> DashConfigurationForPut {
    DashConfigurationForPut::builder()
        .set_mpd_location(get_str(block, "mpd_location").map(String::from))
        .set_origin_manifest_type(
            get_str(block, "origin_manifest_type").map(OriginManifestType::from),
        )
        .build()
}

pub fn live_pre_roll_to_api(block: &Attributes) -> ProviderResult<LivePreRollConfiguration> {
    Ok(LivePreRollConfiguration::builder()
        .set_ad_decision_server_url(get_str(block, "ad_decision_server_url").map(String::from))
        .set_max_duration_seconds(get_i32(block, "max_duration_seconds")?)
        .build())
}

pub fn manifest_processing_rules_to_api(block: &Attributes) -> ManifestProcessingRules {
    let passthrough = get_bool(block, "ad_marker_passthrough_enabled")
        .map(|enabled| AdMarkerPassthrough::builder().enabled(enabled).build());
    ManifestProcessingRules::builder()
        .set_ad_marker_passthrough(passthrough)
        .build()
}

pub fn configuration_aliases_to_api(
    attrs: &Attributes,
) -> Option<HashMap<String, HashMap<String, String>>> {
    attrs.get("configuration_aliases")?.as_map().map(|aliases| {
        aliases
            .iter()
            .map(|(param, values)| (param.clone(), to_string_map(values)))
            .collect()
    })
}

// ========== API -> State ==========

pub fn avail_suppression_from_api(suppression: &AvailSuppression) -> Attributes {
    let mut block = Attributes::new();
    insert_str(&mut block, "mode", suppression.mode().map(|m| m.as_str()));
    insert_str(&mut block, "value", suppression.value());
    insert_str(
        &mut block,
        "fill_policy",
        suppression.fill_policy().map(|p| p.as_str()),
    );
    block
}

pub fn bumper_from_api(bumper: &Bumper) -> Attributes {
    let mut block = Attributes::new();
    insert_str(&mut block, "start_url", bumper.start_url());
    insert_str(&mut block, "end_url", bumper.end_url());
    block
}

pub fn cdn_configuration_from_api(cdn: &CdnConfiguration) -> Attributes {
    let mut block = Attributes::new();
    insert_str(&mut block, "ad_segment_url_prefix", cdn.ad_segment_url_prefix());
    insert_str(
        &mut block,
        "content_segment_url_prefix",
        cdn.content_segment_url_prefix(),
    );
    block
}

pub fn dash_configuration_from_api(dash: &DashConfiguration) -> Attributes {
    let mut block = Attributes::new();
    insert_str(&mut block, "mpd_location", dash.mpd_location());
    insert_str(
        &mut block,
        "origin_manifest_type",
        dash.origin_manifest_type().map(|t| t.as_str()),
    );
    insert_str(
        &mut block,
        "manifest_endpoint_prefix",
        dash.manifest_endpoint_prefix(),
    );
    block
}

pub fn live_pre_roll_from_api(pre_roll: &LivePreRollConfiguration) -> Attributes {
    let mut block = Attributes::new();
    insert_str(
        &mut block,
        "ad_decision_server_url",
        pre_roll.ad_decision_server_url(),
    );
    insert_int(
        &mut block,
        "max_duration_seconds",
        pre_roll.max_duration_seconds(),
    );
    block
}

pub fn manifest_processing_rules_from_api(rules: &ManifestProcessingRules) -> Attributes {
    let mut block = Attributes::new();
    if let Some(enabled) = rules.ad_marker_passthrough().map(|p| p.enabled()) {
        block.insert(
            "ad_marker_passthrough_enabled".to_string(),
            Value::Bool(enabled),
        );
    }
    block
}

pub fn configuration_aliases_from_api(aliases: &HashMap<String, HashMap<String, String>>) -> Value {
    Value::Map(
        aliases
            .iter()
            .map(|(param, values)| (param.clone(), string_map_value(values)))
            .collect(),
    )
}

fn playback_configuration_from_api(out: &GetPlaybackConfigurationOutput) -> Attributes {
    let mut attrs = Attributes::new();
    insert_str(&mut attrs, "name", out.name());
    insert_str(
        &mut attrs,
        "playback_configuration_arn",
        out.playback_configuration_arn(),
    );
    insert_str(&mut attrs, "ad_decision_server_url", out.ad_decision_server_url());
    if let Some(suppression) = out.avail_suppression() {
        insert_block(
            &mut attrs,
            "avail_suppression",
            avail_suppression_from_api(suppression),
        );
    }
    if let Some(bumper) = out.bumper() {
        insert_block(&mut attrs, "bumper", bumper_from_api(bumper));
    }
    if let Some(cdn) = out.cdn_configuration() {
        insert_block(&mut attrs, "cdn_configuration", cdn_configuration_from_api(cdn));
    }
    if let Some(aliases) = out.configuration_aliases()
        && !aliases.is_empty()
    {
        attrs.insert(
            "configuration_aliases".to_string(),
            configuration_aliases_from_api(aliases),
        );
    }
    if let Some(dash) = out.dash_configuration() {
        insert_block(
            &mut attrs,
            "dash_configuration",
            dash_configuration_from_api(dash),
        );
    }
    insert_str(
        &mut attrs,
        "hls_configuration_manifest_endpoint_prefix",
        out.hls_configuration()
            .and_then(|h| h.manifest_endpoint_prefix()),
    );
    if let Some(pre_roll) = out.live_pre_roll_configuration() {
        insert_block(
            &mut attrs,
            "live_pre_roll_configuration",
            live_pre_roll_from_api(pre_roll),
        );
    }
    insert_int(
        &mut attrs,
        PERCENT_ENABLED,
        out.log_configuration().map(|l| l.percent_enabled()),
    );
    if let Some(rules) = out.manifest_processing_rules() {
        insert_block(
            &mut attrs,
            "manifest_processing_rules",
            manifest_processing_rules_from_api(rules),
        );
    }
    insert_int(
        &mut attrs,
        "personalization_threshold_seconds",
        out.personalization_threshold_seconds(),
    );
    insert_str(&mut attrs, "playback_endpoint_prefix", out.playback_endpoint_prefix());
    insert_str(
        &mut attrs,
        "session_initialization_endpoint_prefix",
        out.session_initialization_endpoint_prefix(),
    );
    insert_str(&mut attrs, "slate_ad_url", out.slate_ad_url());
    insert_str(&mut attrs, "transcode_profile_name", out.transcode_profile_name());
    insert_str(
        &mut attrs,
        "video_content_source_url",
        out.video_content_source_url(),
    );
    insert_tags(&mut attrs, out.tags());
    attrs
}

// ========== Operations ==========

pub async fn read(client: &Client, id: &ResourceId, name: &str) -> ProviderResult<State> {
    log::debug!("GetPlaybackConfiguration {}", name);
    match client.get_playback_configuration().name(name).send().await {
        Ok(out) => Ok(
            State::existing(id.clone(), playback_configuration_from_api(&out)).with_identifier(name),
        ),
        Err(err) if is_not_found(&err) => Ok(State::not_found(id.clone())),
        Err(err) => Err(api_error("get playback configuration", err).for_resource(id.clone())),
    }
}

/// PutPlaybackConfiguration with every block of the plan
async fn put(
    client: &Client,
    name: &str,
    attrs: &Attributes,
    tags: Option<HashMap<String, String>>,
) -> ProviderResult<()> {
    let live_pre_roll = get_block(attrs, "live_pre_roll_configuration")
        .map(live_pre_roll_to_api)
        .transpose()?;
    let personalization_threshold = get_i32(attrs, "personalization_threshold_seconds")?;

    log::info!("Putting playback configuration {}", name);
    client
        .put_playback_configuration()
        .name(name)
        .set_ad_decision_server_url(get_str(attrs, "ad_decision_server_url").map(String::from))
        .set_avail_suppression(get_block(attrs, "avail_suppression").map(avail_suppression_to_api))
        .set_bumper(get_block(attrs, "bumper").map(bumper_to_api))
        .set_cdn_configuration(get_block(attrs, "cdn_configuration").map(cdn_configuration_to_api))
        .set_configuration_aliases(configuration_aliases_to_api(attrs))
        .set_dash_configuration(
            get_block(attrs, "dash_configuration").map(dash_configuration_to_api),
        )
        .set_live_pre_roll_configuration(live_pre_roll)
        .set_manifest_processing_rules(
            get_block(attrs, "manifest_processing_rules").map(manifest_processing_rules_to_api),
        )
        .set_personalization_threshold_seconds(personalization_threshold)
        .set_slate_ad_url(get_str(attrs, "slate_ad_url").map(String::from))
        .set_transcode_profile_name(get_str(attrs, "transcode_profile_name").map(String::from))
        .set_video_content_source_url(
            get_str(attrs, "video_content_source_url").map(String::from),
        )
        .set_tags(tags)
        .send()
        .await
        .map_err(|e| api_error("put playback configuration", e))?;
    Ok(())
}

async fn configure_logs(client: &Client, name: &str, percent_enabled: i32) -> ProviderResult<()> {
    log::info!(
        "Configuring logs for playback configuration {} at {}%",
        name,
        percent_enabled
    );
    client
        .configure_logs_for_playback_configuration()
        .playback_configuration_name(name)
        .percent_enabled(percent_enabled)
        .send()
        .await
        .map_err(|e| api_error("configure logs for playback configuration", e))?;
    Ok(())
}

pub async fn create(client: &Client, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let name =
        get_str(attrs, "name").ok_or_else(|| ProviderError::missing_attribute(id, "name"))?;

    put(client, name, attrs, tags_for_create(attrs))
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    let percent = get_i32(attrs, PERCENT_ENABLED).map_err(|e| e.for_resource(id.clone()))?;
    if let Some(percent) = percent {
        configure_logs(client, name, percent)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    read(client, id, name).await
}

pub async fn update(
    client: &Client,
    id: &ResourceId,
    name: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let attrs = &to.attributes;

    put(client, name, attrs, None)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    if let Some(arn) = from.get_str("playback_configuration_arn") {
        apply_tag_diff(
            client,
            arn,
            &tags_from_attributes(&from.attributes),
            &tags_from_attributes(attrs),
        )
        .await
        .map_err(|e| e.for_resource(id.clone()))?;
    }

    let percent = get_i32(attrs, PERCENT_ENABLED).map_err(|e| e.for_resource(id.clone()))?;
    let applied = from.attributes.get(PERCENT_ENABLED).and_then(Value::as_int);
    if let Some(percent) = percent
        && applied != Some(i64::from(percent))
    {
        configure_logs(client, name, percent)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    read(client, id, name).await
}

pub async fn delete(client: &Client, id: &ResourceId, name: &str) -> ProviderResult<()> {
    log::info!("Deleting playback configuration {}", name);
    let result = client.delete_playback_configuration().name(name).send().await;
    deleted("delete playback configuration", result).map_err(|e| e.for_resource(id.clone()))
}
