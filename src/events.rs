use crate::config::{EffectKind, TargetKind};
use bevy_ecs::prelude::Resource;
use std::fmt;

#[derive(Debug, Clone)]
pub enum StageEvent {
    TargetRegistered { kind: TargetKind },
    PopupShown { kind: TargetKind },
    EffectSpawned { kind: EffectKind },
    EffectExpired { kind: EffectKind },
    EffectDropped { kind: EffectKind },
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageEvent::TargetRegistered { kind } => write!(f, "TargetRegistered kind={kind}"),
            StageEvent::PopupShown { kind } => write!(f, "PopupShown kind={kind}"),
            StageEvent::EffectSpawned { kind } => write!(f, "EffectSpawned kind={kind}"),
            StageEvent::EffectExpired { kind } => write!(f, "EffectExpired kind={kind}"),
            StageEvent::EffectDropped { kind } => write!(f, "EffectDropped kind={kind}"),
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<StageEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<StageEvent> {
        self.events.drain(..).collect()
    }
}
