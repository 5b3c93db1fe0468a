//! Background asset loading.
//!
//! Decodes run on worker threads; completions arrive as [`AssetEvent`]s on
//! an mpsc channel the frame loop drains once per tick. Completion order
//! relative to frames is unguaranteed, so everything downstream tolerates
//! "not yet available" indefinitely. A failed load is reported once and
//! the dependent feature simply stays inactive; there are no retries and
//! nothing here can take down the frame loop.

use crate::config::{AssetsConfig, TargetKind};
use anyhow::{bail, Context, Result};
use glam::{Mat4, Quat, Vec3};
use std::fs;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSlot {
    Showcase,
    EffectProp,
    LabelModel(TargetKind),
}

#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Merged primitive bounds for mesh nodes, in node-local space.
    pub bounds: Option<(Vec3, Vec3)>,
}

#[derive(Debug, Clone)]
pub struct AnimClip {
    pub name: String,
    pub duration: f32,
    pub rot_keys: Vec<(f32, Quat)>,
}

impl AnimClip {
    /// Samples the rotation track at `time`, slerping between the
    /// bracketing keys. An empty track is identity.
    pub fn sample_rotation(&self, time: f32) -> Quat {
        let Some(&(first_time, first_rot)) = self.rot_keys.first() else {
            return Quat::IDENTITY;
        };
        if time <= first_time {
            return first_rot;
        }
        for window in self.rot_keys.windows(2) {
            let (t0, q0) = window[0];
            let (t1, q1) = window[1];
            if time < t1 {
                let span = (t1 - t0).max(f32::EPSILON);
                return q0.slerp(q1, (time - t0) / span);
            }
        }
        self.rot_keys.last().map(|&(_, q)| q).unwrap_or(Quat::IDENTITY)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub nodes: Vec<NodeTemplate>,
    pub clips: Vec<AnimClip>,
    /// Overall scene bounds in model space, when any mesh was present.
    pub bounds: Option<(Vec3, Vec3)>,
}

pub struct LoadedTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub enum AssetEvent {
    Model { slot: ModelSlot, model: Arc<LoadedModel> },
    Font { bytes: Arc<Vec<u8>> },
    SpriteTexture { texture: LoadedTexture },
    Failed { what: String, error: String },
}

pub struct AssetServer {
    rx: Receiver<AssetEvent>,
}

impl AssetServer {
    /// Kicks off every configured load. `label_models` lists the modelled
    /// labels (kind, path) pulled from the target table.
    pub fn start(cfg: &AssetsConfig, label_models: &[(TargetKind, String)]) -> Self {
        let (tx, rx) = channel();

        spawn_model_load(tx.clone(), ModelSlot::Showcase, cfg.showcase_model.clone());
        spawn_model_load(tx.clone(), ModelSlot::EffectProp, cfg.effect_prop.clone());
        for (kind, path) in label_models {
            spawn_model_load(tx.clone(), ModelSlot::LabelModel(*kind), path.clone());
        }

        let font_path = cfg.font.clone();
        let font_tx = tx.clone();
        thread::spawn(move || {
            let event = match load_font(&font_path) {
                Ok(bytes) => AssetEvent::Font { bytes: Arc::new(bytes) },
                Err(err) => failure("font", &font_path, err),
            };
            let _ = font_tx.send(event);
        });

        let texture_path = cfg.sprite_texture.clone();
        thread::spawn(move || {
            let event = match load_texture(&texture_path) {
                Ok(texture) => AssetEvent::SpriteTexture { texture },
                Err(err) => failure("sprite texture", &texture_path, err),
            };
            let _ = tx.send(event);
        });

        Self { rx }
    }

    /// Completions that arrived since the last frame.
    pub fn poll(&mut self) -> Vec<AssetEvent> {
        self.rx.try_iter().collect()
    }
}

fn spawn_model_load(tx: Sender<AssetEvent>, slot: ModelSlot, path: String) {
    thread::spawn(move || {
        let event = match load_model(&path) {
            Ok(model) => AssetEvent::Model { slot, model: Arc::new(model) },
            Err(err) => failure("model", &path, err),
        };
        let _ = tx.send(event);
    });
}

fn failure(what: &str, path: &str, err: anyhow::Error) -> AssetEvent {
    AssetEvent::Failed { what: format!("{what} ({path})"), error: format!("{err:#}") }
}

pub fn load_model(path: &str) -> Result<LoadedModel> {
    let (document, buffers, _images) =
        gltf::import(path).with_context(|| format!("Failed to import glTF '{path}'"))?;

    let node_count = document.nodes().len();
    let mut parents: Vec<Option<usize>> = vec![None; node_count];
    for node in document.nodes() {
        for child in node.children() {
            parents[child.index()] = Some(node.index());
        }
    }

    let mut nodes = Vec::with_capacity(node_count);
    for node in document.nodes() {
        let (translation, rotation, scale) = node.transform().decomposed();
        let bounds = node.mesh().and_then(|mesh| {
            let mut min = Vec3::splat(f32::INFINITY);
            let mut max = Vec3::splat(f32::NEG_INFINITY);
            for primitive in mesh.primitives() {
                let bb = primitive.bounding_box();
                min = min.min(Vec3::from(bb.min));
                max = max.max(Vec3::from(bb.max));
            }
            (min.x <= max.x).then_some((min, max))
        });
        nodes.push(NodeTemplate {
            name: node.name().map(str::to_string),
            parent: parents[node.index()],
            translation: Vec3::from(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from(scale),
            bounds,
        });
    }

    let bounds = scene_bounds(&nodes);
    let clips = read_clips(&document, &buffers);
    Ok(LoadedModel { nodes, clips, bounds })
}

/// Model-space bounds: every node's local bounds carried through its
/// ancestor chain, merged.
fn scene_bounds(nodes: &[NodeTemplate]) -> Option<(Vec3, Vec3)> {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut any = false;
    for (index, node) in nodes.iter().enumerate() {
        let Some((local_min, local_max)) = node.bounds else {
            continue;
        };
        let matrix = global_matrix(index, nodes);
        for corner in aabb_corners(local_min, local_max) {
            let world = matrix.transform_point3(corner);
            min = min.min(world);
            max = max.max(world);
        }
        any = true;
    }
    any.then_some((min, max))
}

fn global_matrix(index: usize, nodes: &[NodeTemplate]) -> Mat4 {
    let node = &nodes[index];
    let local = Mat4::from_scale_rotation_translation(node.scale, node.rotation, node.translation);
    match node.parent {
        Some(parent) => global_matrix(parent, nodes) * local,
        None => local,
    }
}

fn aabb_corners(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}

fn read_clips(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Vec<AnimClip> {
    let mut clips = Vec::new();
    for animation in document.animations() {
        let mut rot_keys: Vec<(f32, Quat)> = Vec::new();
        let mut duration = 0.0f32;
        for channel in animation.channels() {
            if channel.target().property() != gltf::animation::Property::Rotation {
                continue;
            }
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
                continue;
            };
            let gltf::animation::util::ReadOutputs::Rotations(rotations) = outputs else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            for (time, quat) in times.iter().copied().zip(rotations.into_f32()) {
                rot_keys.push((time, Quat::from_array(quat)));
            }
            duration = duration.max(times.last().copied().unwrap_or(0.0));
            break;
        }
        if !rot_keys.is_empty() {
            clips.push(AnimClip {
                name: animation.name().unwrap_or("clip").to_string(),
                duration,
                rot_keys,
            });
        }
    }
    clips
}

pub fn load_font(path: &str) -> Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read font '{path}'"))?;
    if bytes.is_empty() {
        bail!("Font file '{path}' is empty");
    }
    Ok(bytes)
}

pub fn load_texture(path: &str) -> Result<LoadedTexture> {
    let image = image::open(path).with_context(|| format!("Failed to decode texture '{path}'"))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(LoadedTexture { width, height, rgba: rgba.into_raw() })
}
