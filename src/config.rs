use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Vitrine".to_string(), width: 1280, height: 720, vsync: true, fullscreen: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    #[serde(default = "CameraConfig::default_radius")]
    pub orbit_radius: f32,
    #[serde(default = "CameraConfig::default_min_radius")]
    pub min_radius: f32,
    #[serde(default = "CameraConfig::default_max_radius")]
    pub max_radius: f32,
    #[serde(default = "CameraConfig::default_damping")]
    pub damping: f32,
    #[serde(default = "CameraConfig::default_pitch_degrees")]
    pub initial_pitch_degrees: f32,
    #[serde(default)]
    pub initial_yaw_degrees: f32,
}

impl CameraConfig {
    const fn default_fov_degrees() -> f32 {
        45.0
    }
    const fn default_near() -> f32 {
        0.1
    }
    const fn default_far() -> f32 {
        100.0
    }
    const fn default_radius() -> f32 {
        5.4
    }
    const fn default_min_radius() -> f32 {
        2.0
    }
    const fn default_max_radius() -> f32 {
        10.0
    }
    const fn default_damping() -> f32 {
        0.1
    }
    const fn default_pitch_degrees() -> f32 {
        -21.0
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            orbit_radius: Self::default_radius(),
            min_radius: Self::default_min_radius(),
            max_radius: Self::default_max_radius(),
            damping: Self::default_damping(),
            initial_pitch_degrees: Self::default_pitch_degrees(),
            initial_yaw_degrees: 0.0,
        }
    }
}

/// The four interactive titles the scene knows about. Resolved from config
/// once at load; nothing downstream compares strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Contract,
    Chart,
    Info,
    Socials,
}

impl TargetKind {
    pub fn title(self) -> &'static str {
        match self {
            TargetKind::Contract => "CONTRACT",
            TargetKind::Chart => "CHART",
            TargetKind::Info => "INFO",
            TargetKind::Socials => "SOCIALS",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Mesh,
    Sprite,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectKind::Mesh => f.write_str("mesh"),
            EffectKind::Sprite => f.write_str("sprite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopRight,
}

/// Where a popup sits on screen while its target is active.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    FixedCorner {
        corner: Corner,
        #[serde(default = "Placement::default_margin")]
        margin: f32,
    },
    Dynamic {
        #[serde(default = "Placement::default_drop")]
        drop: f32,
    },
}

impl Placement {
    const fn default_margin() -> f32 {
        20.0
    }
    const fn default_drop() -> f32 {
        20.0
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Placement::Dynamic { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct LinkEntry {
    pub label: String,
    pub url: String,
}

/// Opaque per-target overlay payload. The core never interprets these
/// beyond handing them to the popup surface.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct PopupContent {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    #[serde(default)]
    pub chart_url: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LabelSource {
    /// A billboarded title built from the loaded font.
    Text,
    /// A modelled sign; `forward_correction_degrees` compensates the
    /// asset's authored forward axis when facing the viewpoint.
    Model {
        path: String,
        #[serde(default)]
        forward_correction_degrees: [f32; 3],
    },
}

impl Default for LabelSource {
    fn default() -> Self {
        LabelSource::Text
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub kind: TargetKind,
    pub label: String,
    pub position: [f32; 3],
    #[serde(default = "TargetConfig::default_color")]
    pub color: [f32; 3],
    #[serde(default)]
    pub source: LabelSource,
    pub placement: Placement,
    /// Explicit hit box half extents; derived from the label text when
    /// omitted.
    #[serde(default)]
    pub hit_half: Option<[f32; 3]>,
    #[serde(default)]
    pub content: PopupContent,
}

impl TargetConfig {
    const fn default_color() -> [f32; 3] {
        [0.373, 0.451, 0.588]
    }

    /// World-space hit box half extents: the explicit box when configured,
    /// otherwise derived from the title's glyph metrics.
    pub fn hit_half_extents(&self) -> [f32; 3] {
        self.hit_half.unwrap_or_else(|| {
            let glyph = 0.2f32;
            let width = self.label.chars().count().max(1) as f32 * glyph * 0.7;
            [width * 0.5, glyph * 0.75, 0.15]
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopupTuning {
    #[serde(default = "PopupTuning::default_entrance_duration")]
    pub entrance_duration: f32,
}

impl PopupTuning {
    const fn default_entrance_duration() -> f32 {
        0.5
    }
}

impl Default for PopupTuning {
    fn default() -> Self {
        Self { entrance_duration: Self::default_entrance_duration() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectsConfig {
    #[serde(default = "EffectsConfig::default_base_direction")]
    pub base_direction: [f32; 3],
    #[serde(default = "EffectsConfig::default_jitter")]
    pub jitter: f32,
    #[serde(default = "EffectsConfig::default_base_distance")]
    pub base_distance: f32,
    #[serde(default = "EffectsConfig::default_extra_distance")]
    pub extra_distance: f32,
    #[serde(default = "EffectsConfig::default_duration")]
    pub duration: f32,
    #[serde(default = "EffectsConfig::default_guard")]
    pub guard: f32,
    #[serde(default = "EffectsConfig::default_fade_duration")]
    pub fade_duration: f32,
    #[serde(default = "EffectsConfig::default_sprite_weight")]
    pub sprite_weight: f32,
    #[serde(default = "EffectsConfig::default_mesh_scale")]
    pub mesh_scale: f32,
    #[serde(default = "EffectsConfig::default_sprite_scale")]
    pub sprite_scale: f32,
    #[serde(default = "EffectsConfig::default_sprite_end_scale")]
    pub sprite_end_scale: f32,
    #[serde(default = "EffectsConfig::default_max_live")]
    pub max_live: u32,
    #[serde(default = "EffectsConfig::default_anchor_offset")]
    pub anchor_offset: [f32; 3],
    #[serde(default = "EffectsConfig::default_fallback_position")]
    pub fallback_position: [f32; 3],
    #[serde(default)]
    pub fallback_orientation_degrees: [f32; 3],
    #[serde(default = "EffectsConfig::default_batch_count")]
    pub batch_count: u32,
    #[serde(default = "EffectsConfig::default_batch_delay")]
    pub batch_delay: f32,
}

impl EffectsConfig {
    const fn default_base_direction() -> [f32; 3] {
        [0.0, 1.0, 0.35]
    }
    const fn default_jitter() -> f32 {
        0.05
    }
    const fn default_base_distance() -> f32 {
        1.6
    }
    const fn default_extra_distance() -> f32 {
        0.9
    }
    const fn default_duration() -> f32 {
        0.9
    }
    const fn default_guard() -> f32 {
        0.25
    }
    const fn default_fade_duration() -> f32 {
        1.1
    }
    const fn default_sprite_weight() -> f32 {
        0.5
    }
    const fn default_mesh_scale() -> f32 {
        0.18
    }
    const fn default_sprite_scale() -> f32 {
        0.25
    }
    const fn default_sprite_end_scale() -> f32 {
        2.5
    }
    const fn default_max_live() -> u32 {
        64
    }
    const fn default_anchor_offset() -> [f32; 3] {
        [0.0, 1.2, 0.0]
    }
    const fn default_fallback_position() -> [f32; 3] {
        [0.0, 0.5, 0.0]
    }
    const fn default_batch_count() -> u32 {
        10
    }
    const fn default_batch_delay() -> f32 {
        0.1
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            base_direction: Self::default_base_direction(),
            jitter: Self::default_jitter(),
            base_distance: Self::default_base_distance(),
            extra_distance: Self::default_extra_distance(),
            duration: Self::default_duration(),
            guard: Self::default_guard(),
            fade_duration: Self::default_fade_duration(),
            sprite_weight: Self::default_sprite_weight(),
            mesh_scale: Self::default_mesh_scale(),
            sprite_scale: Self::default_sprite_scale(),
            sprite_end_scale: Self::default_sprite_end_scale(),
            max_live: Self::default_max_live(),
            anchor_offset: Self::default_anchor_offset(),
            fallback_position: Self::default_fallback_position(),
            fallback_orientation_degrees: [0.0; 3],
            batch_count: Self::default_batch_count(),
            batch_delay: Self::default_batch_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "AssetsConfig::default_showcase_model")]
    pub showcase_model: String,
    #[serde(default = "AssetsConfig::default_effect_prop")]
    pub effect_prop: String,
    #[serde(default = "AssetsConfig::default_font")]
    pub font: String,
    #[serde(default = "AssetsConfig::default_sprite_texture")]
    pub sprite_texture: String,
}

impl AssetsConfig {
    fn default_showcase_model() -> String {
        "assets/models/idol.glb".to_string()
    }
    fn default_effect_prop() -> String {
        "assets/models/coin.glb".to_string()
    }
    fn default_font() -> String {
        "assets/fonts/display.ttf".to_string()
    }
    fn default_sprite_texture() -> String {
        "assets/textures/spark.png".to_string()
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            showcase_model: Self::default_showcase_model(),
            effect_prop: Self::default_effect_prop(),
            font: Self::default_font(),
            sprite_texture: Self::default_sprite_texture(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub popup: PopupTuning,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            popup: PopupTuning::default(),
            effects: EffectsConfig::default(),
            assets: AssetsConfig::default(),
            targets: default_targets(),
        }
    }
}

fn default_targets() -> Vec<TargetConfig> {
    vec![
        TargetConfig {
            kind: TargetKind::Socials,
            label: "SOCIALS".to_string(),
            position: [1.0, -1.0, -2.0],
            color: TargetConfig::default_color(),
            source: LabelSource::Text,
            placement: Placement::FixedCorner {
                corner: Corner::BottomLeft,
                margin: Placement::default_margin(),
            },
            hit_half: None,
            content: PopupContent {
                links: vec![
                    LinkEntry { label: "Telegram".to_string(), url: "https://telegram.org".to_string() },
                    LinkEntry { label: "Twitter".to_string(), url: "https://twitter.com".to_string() },
                ],
                ..PopupContent::default()
            },
        },
        TargetConfig {
            kind: TargetKind::Chart,
            label: "CHART".to_string(),
            position: [0.0, 1.0, -1.5],
            color: TargetConfig::default_color(),
            source: LabelSource::Text,
            placement: Placement::FixedCorner {
                corner: Corner::BottomRight,
                margin: Placement::default_margin(),
            },
            hit_half: None,
            content: PopupContent {
                chart_url: "https://dexscreener.com".to_string().into(),
                ..PopupContent::default()
            },
        },
        TargetConfig {
            kind: TargetKind::Info,
            label: "INFO".to_string(),
            position: [-2.5, 1.0, 1.5],
            color: TargetConfig::default_color(),
            source: LabelSource::Text,
            placement: Placement::Dynamic { drop: Placement::default_drop() },
            hit_half: None,
            content: PopupContent {
                body: Some("Community-driven showcase with fast, low-fee interactions.".to_string()),
                ..PopupContent::default()
            },
        },
        TargetConfig {
            kind: TargetKind::Contract,
            label: "CONTRACT".to_string(),
            position: [2.2, 0.2, 1.0],
            color: TargetConfig::default_color(),
            source: LabelSource::Model {
                path: "assets/models/sign.glb".to_string(),
                forward_correction_degrees: [0.0, 90.0, 0.0],
            },
            placement: Placement::Dynamic { drop: Placement::default_drop() },
            hit_half: None,
            content: PopupContent {
                contract_address: Some("1111111111111111111111111111".to_string()),
                ..PopupContent::default()
            },
        },
    ]
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("[config] load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (i, target) in self.targets.iter().enumerate() {
            if self.targets[..i].iter().any(|other| other.kind == target.kind) {
                bail!("Duplicate target kind '{}' in config", target.kind);
            }
        }
        if !(0.0..=1.0).contains(&self.effects.sprite_weight) {
            bail!("effects.sprite_weight must lie in [0, 1]");
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(vsync) = overrides.vsync {
            self.window.vsync = vsync;
        }
    }

    pub fn target(&self, kind: TargetKind) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.kind == kind)
    }
}
