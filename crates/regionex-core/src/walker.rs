//! Streaming walk over a track document.
//!
//! The walk is split in two. [`WalkerState::step`] is a pure transition over
//! the three pieces of context the document needs (enclosing track, content
//! element being decoded, time domain) and describes what it saw as a list of
//! [`Effect`]s. [`DocumentWalker`] owns everything that accumulates (region
//! drafts, the clip name table, the tempo curve, the sample rate) and applies
//! those effects. Feeding canned event sequences to either half needs no XML.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    diagnostics::Diagnostic,
    naming::resolve_names,
    region::{Region, RegionDraft, RegionField, RegionSource, ResolveError},
    tempo::TempoCurve,
    time::{TemporalValue, TimeUnit, parse_decimal, parse_integer},
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WalkError {
    #[error("document never declared a sample rate")]
    MissingSampleRate,
    #[error("tempo track mode is active but the document holds no tempo points")]
    EmptyTempoCurve,
}

/// Attribute pairs of one element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Keys are matched exactly, as XML attribute names are case-sensitive.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    Open { tag: String, attributes: Attributes },
    Close,
}

impl ParseEvent {
    #[must_use]
    pub fn open(tag: impl Into<String>) -> Self {
        Self::Open {
            tag: tag.into(),
            attributes: Attributes::new(),
        }
    }

    /// `<obj class="..">`
    #[must_use]
    pub fn obj(class: &str) -> Self {
        Self::open("obj").with("class", class)
    }

    /// `<tag name=".." value="..">`
    #[must_use]
    pub fn field(tag: &str, name: &str, value: &str) -> Self {
        Self::open(tag).with("name", name).with("value", value)
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Open { attributes, .. } = &mut self {
            attributes.insert(key, value);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Marker,
    Midi,
    Instrument,
}

impl TrackKind {
    #[must_use]
    pub fn from_class(class: &str) -> Option<Self> {
        [
            ("MAudioTrackEvent", Self::Audio),
            ("MMarkerTrackEvent", Self::Marker),
            ("MMidiTrackEvent", Self::Midi),
            ("MInstrumentTrackEvent", Self::Instrument),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(class))
        .map(|(_, kind)| kind)
    }
}

/// Elements whose fields the walker decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    AudioEvent,
    AudioPartEvent,
    RangeMarkerEvent,
    MidiPartEvent,
    TempoEvent,
    ArrangeSetup,
}

impl ContentKind {
    #[must_use]
    pub fn from_class(class: &str) -> Option<Self> {
        [
            ("MAudioEvent", Self::AudioEvent),
            ("MAudioPartEvent", Self::AudioPartEvent),
            ("MRangeMarkerEvent", Self::RangeMarkerEvent),
            ("MMidiPartEvent", Self::MidiPartEvent),
            ("MTempoEvent", Self::TempoEvent),
            ("PArrangeSetup", Self::ArrangeSetup),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(class))
        .map(|(_, kind)| kind)
    }

    /// The region this element produces, if any.
    #[must_use]
    pub fn region_source(self) -> Option<RegionSource> {
        match self {
            Self::AudioEvent => Some(RegionSource::AudioEvent),
            Self::AudioPartEvent => Some(RegionSource::AudioPartEvent),
            Self::RangeMarkerEvent => Some(RegionSource::RangeMarkerEvent),
            Self::MidiPartEvent => Some(RegionSource::MidiPartEvent),
            Self::TempoEvent | Self::ArrangeSetup => None,
        }
    }
}

/// Name-carrying children that are decoded on behalf of their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedKind {
    /// `MAudioPart` inside `MAudioPartEvent`.
    AudioPart,
    /// `PAudioClip` inside `MAudioEvent`.
    AudioClip { id: Option<String> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDomain {
    #[default]
    Musical,
    Linear,
}

impl TimeDomain {
    #[must_use]
    pub fn unit(self) -> TimeUnit {
        match self {
            Self::Musical => TimeUnit::MidiTicks,
            Self::Linear => TimeUnit::Seconds,
        }
    }
}

/// `depth` counts elements open below the context's own element, so a close
/// at depth zero is the context's own close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackContext {
    #[default]
    Outside,
    Inside { kind: TrackKind, depth: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentContext {
    #[default]
    Idle,
    Element { kind: ContentKind, depth: usize },
    Nested {
        parent: ContentKind,
        child: NestedKind,
        depth: usize,
    },
}

impl ContentContext {
    #[must_use]
    pub fn active_kind(&self) -> Option<ContentKind> {
        match self {
            Self::Idle => None,
            Self::Element { kind, .. } => Some(*kind),
            Self::Nested { parent, .. } => Some(*parent),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DomainScope {
    #[default]
    Closed,
    Open { depth: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkerState {
    pub track: TrackContext,
    pub content: ContentContext,
    pub domain_scope: DomainScope,
    pub domain: TimeDomain,
}

/// What a single step observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    EnterTrack(TrackKind),
    ExitTrack(TrackKind),
    DomainChanged(TimeDomain),
    BeginRegion(RegionSource),
    FinishRegion,
    SetStart(TemporalValue),
    SetLength(TemporalValue),
    SetName(String),
    RejectRegion(ResolveError),
    DescribeClip { id: Option<String>, name: String },
    ReferenceClip { id: String },
    BeginTempoPoint,
    TempoBpm(f64),
    TempoPosition(f64),
    TempoRamp(bool),
    EndTempoPoint,
    SampleRate(f64),
    RehearsalTempo(f64),
    RehearsalMode(bool),
    Diagnostic(Diagnostic),
}

impl WalkerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the state by one event.
    #[must_use]
    pub fn step(self, event: &ParseEvent) -> (Self, Vec<Effect>) {
        let mut next = self;
        let mut effects = Vec::new();
        match event {
            ParseEvent::Open { tag, attributes } => next.open(tag, attributes, &mut effects),
            ParseEvent::Close => next.close(&mut effects),
        }
        (next, effects)
    }

    fn open(&mut self, tag: &str, attributes: &Attributes, effects: &mut Vec<Effect>) {
        let element = Element::new(tag, attributes);

        match &mut self.track {
            TrackContext::Outside => {
                if let Some(kind) = element.class_of_obj().and_then(TrackKind::from_class) {
                    self.track = TrackContext::Inside { kind, depth: 0 };
                    self.domain = TimeDomain::Musical;
                    effects.push(Effect::EnterTrack(kind));
                }
            }
            TrackContext::Inside { depth, .. } => *depth += 1,
        }

        let mut entered_domain = false;
        if self.content == ContentContext::Idle {
            entered_domain = self.open_while_idle(&element, effects);
        } else {
            match &mut self.content {
                ContentContext::Element { depth, .. } | ContentContext::Nested { depth, .. } => {
                    *depth += 1;
                }
                ContentContext::Idle => {}
            }
            self.decode_field(&element, effects);
            self.enter_nested(&element);
        }

        if let DomainScope::Open { depth } = &mut self.domain_scope {
            if !entered_domain {
                *depth += 1;
            }
        }
    }

    /// Returns whether this element opened the domain scope.
    fn open_while_idle(&mut self, element: &Element<'_>, effects: &mut Vec<Effect>) -> bool {
        if element.is("obj") {
            let Some(kind) = element.class().and_then(ContentKind::from_class) else {
                return false;
            };
            match kind.region_source() {
                Some(source) => {
                    if matches!(self.track, TrackContext::Inside { .. }) {
                        effects.push(Effect::BeginRegion(source));
                        self.content = ContentContext::Element { kind, depth: 0 };
                    } else {
                        effects.push(Effect::Diagnostic(Diagnostic::ContentOutsideTrack {
                            content: kind,
                        }));
                    }
                }
                None => {
                    if kind == ContentKind::TempoEvent {
                        effects.push(Effect::BeginTempoPoint);
                    }
                    self.content = ContentContext::Element { kind, depth: 0 };
                }
            }
            return false;
        }

        let Some(name) = element.name() else {
            return false;
        };
        if element.is("member")
            && name.eq_ignore_ascii_case("Domain")
            && self.domain_scope == DomainScope::Closed
            && matches!(self.track, TrackContext::Inside { .. })
        {
            self.domain_scope = DomainScope::Open { depth: 0 };
            return true;
        }

        if self.domain_scope == (DomainScope::Open { depth: 0 })
            && element.is("int")
            && name.eq_ignore_ascii_case("type")
        {
            if let Some(text) = element.value() {
                match parse_integer(text) {
                    Some(0) => self.set_domain(TimeDomain::Musical, effects),
                    Some(1) => self.set_domain(TimeDomain::Linear, effects),
                    _ => effects.push(malformed("Domain/type", text)),
                }
            }
        } else if element.is("float") && name.eq_ignore_ascii_case("rehearsaltempo") {
            if let Some(text) = element.value() {
                match parse_decimal(text) {
                    Some(bpm) if bpm > 0.0 => effects.push(Effect::RehearsalTempo(bpm)),
                    _ => effects.push(malformed("rehearsaltempo", text)),
                }
            }
        } else if element.is("int") && name.eq_ignore_ascii_case("rehearsalmode") {
            if let Some(text) = element.value() {
                match parse_integer(text) {
                    Some(mode) => effects.push(Effect::RehearsalMode(mode == 1)),
                    None => effects.push(malformed("rehearsalmode", text)),
                }
            }
        }
        false
    }

    fn set_domain(&mut self, domain: TimeDomain, effects: &mut Vec<Effect>) {
        self.domain = domain;
        effects.push(Effect::DomainChanged(domain));
    }

    fn decode_field(&self, element: &Element<'_>, effects: &mut Vec<Effect>) {
        let domain_unit = self.domain.unit();
        match &self.content {
            ContentContext::Idle => {}
            ContentContext::Element {
                kind: ContentKind::AudioEvent,
                depth: 1,
            } => {
                if element.is_named("string", "Description") {
                    if let Some(text) = element.value() {
                        effects.push(Effect::SetName(text.to_string()));
                    }
                } else if element.is("float") {
                    // Clip-level lengths are stored in samples whatever the domain.
                    decode_bounds(element, domain_unit, TimeUnit::Samples, effects);
                } else if element.is_named("obj", "AudioClip") {
                    if let Some(id) = element.attribute("ID") {
                        effects.push(Effect::ReferenceClip { id: id.to_string() });
                    }
                }
            }
            ContentContext::Element {
                kind: ContentKind::AudioPartEvent | ContentKind::MidiPartEvent,
                depth: 1,
            } => {
                if element.is("float") {
                    decode_bounds(element, domain_unit, domain_unit, effects);
                }
            }
            ContentContext::Element {
                kind: ContentKind::RangeMarkerEvent,
                depth: 1,
            } => {
                if element.is("float") {
                    decode_bounds(element, domain_unit, domain_unit, effects);
                } else if element.is_named("string", "Name") {
                    if let Some(text) = element.value() {
                        effects.push(Effect::SetName(text.to_string()));
                    }
                }
            }
            // The part's name lives in its single MMidiPart child.
            ContentContext::Element {
                kind: ContentKind::MidiPartEvent,
                depth: 2,
            }
            | ContentContext::Nested {
                child: NestedKind::AudioPart,
                depth: 1,
                ..
            } => {
                if element.is_named("string", "Name") {
                    if let Some(text) = element.value() {
                        effects.push(Effect::SetName(text.to_string()));
                    }
                }
            }
            ContentContext::Nested {
                child: NestedKind::AudioClip { id },
                depth: 1,
                ..
            } => {
                if element.is_named("string", "Name") {
                    if let Some(text) = element.value() {
                        effects.push(Effect::DescribeClip {
                            id: id.clone(),
                            name: text.to_string(),
                        });
                    }
                }
            }
            ContentContext::Element {
                kind: ContentKind::ArrangeSetup,
                depth: 1,
            } => {
                if element.is_named("float", "SampleRate") {
                    if let Some(text) = element.value() {
                        match parse_decimal(text) {
                            Some(rate) if rate > 0.0 => effects.push(Effect::SampleRate(rate)),
                            _ => effects.push(malformed("SampleRate", text)),
                        }
                    }
                }
            }
            ContentContext::Element {
                kind: ContentKind::TempoEvent,
                ..
            } => decode_tempo_field(element, effects),
            ContentContext::Element { .. } | ContentContext::Nested { .. } => {}
        }
    }

    fn enter_nested(&mut self, element: &Element<'_>) {
        let ContentContext::Element { kind, depth: 1 } = self.content else {
            return;
        };
        let Some(class) = element.class_of_obj() else {
            return;
        };
        let child = match kind {
            ContentKind::AudioPartEvent if class.eq_ignore_ascii_case("MAudioPart") => {
                NestedKind::AudioPart
            }
            ContentKind::AudioEvent if class.eq_ignore_ascii_case("PAudioClip") => {
                NestedKind::AudioClip {
                    id: element.attribute("ID").map(str::to_string),
                }
            }
            _ => return,
        };
        self.content = ContentContext::Nested {
            parent: kind,
            child,
            depth: 0,
        };
    }

    fn close(&mut self, effects: &mut Vec<Effect>) {
        match &mut self.content {
            ContentContext::Idle => {}
            ContentContext::Element { kind, depth: 0 } => {
                match kind {
                    ContentKind::TempoEvent => effects.push(Effect::EndTempoPoint),
                    ContentKind::ArrangeSetup => {}
                    _ => effects.push(Effect::FinishRegion),
                }
                self.content = ContentContext::Idle;
            }
            ContentContext::Nested {
                parent, depth: 0, ..
            } => {
                self.content = ContentContext::Element {
                    kind: *parent,
                    depth: 0,
                };
            }
            ContentContext::Element { depth, .. } | ContentContext::Nested { depth, .. } => {
                *depth -= 1;
            }
        }

        match &mut self.domain_scope {
            DomainScope::Closed => {}
            DomainScope::Open { depth: 0 } => self.domain_scope = DomainScope::Closed,
            DomainScope::Open { depth } => *depth -= 1,
        }

        match &mut self.track {
            TrackContext::Outside => {}
            TrackContext::Inside { kind, depth: 0 } => {
                effects.push(Effect::ExitTrack(*kind));
                self.track = TrackContext::Outside;
            }
            TrackContext::Inside { depth, .. } => *depth -= 1,
        }
    }
}

fn decode_bounds(
    element: &Element<'_>,
    start_unit: TimeUnit,
    length_unit: TimeUnit,
    effects: &mut Vec<Effect>,
) {
    let (field, unit) = match element.name() {
        Some(name) if name.eq_ignore_ascii_case("Start") => (RegionField::Start, start_unit),
        Some(name) if name.eq_ignore_ascii_case("Length") => (RegionField::Length, length_unit),
        _ => return,
    };
    let Some(text) = element.value() else {
        return;
    };
    match parse_decimal(text) {
        Some(magnitude) => {
            let value = TemporalValue::new(magnitude, unit);
            effects.push(match field {
                RegionField::Start => Effect::SetStart(value),
                RegionField::Length => Effect::SetLength(value),
            });
        }
        None => {
            effects.push(Effect::RejectRegion(ResolveError::MalformedValue {
                field,
                text: text.to_string(),
            }));
            let label = match field {
                RegionField::Start => "Start",
                RegionField::Length => "Length",
            };
            effects.push(malformed(label, text));
        }
    }
}

fn decode_tempo_field(element: &Element<'_>, effects: &mut Vec<Effect>) {
    let (Some(name), Some(text)) = (element.name(), element.value()) else {
        return;
    };
    if name.eq_ignore_ascii_case("BPM") {
        match parse_decimal(text) {
            Some(bpm) if bpm > 0.0 => effects.push(Effect::TempoBpm(bpm)),
            _ => effects.push(malformed("BPM", text)),
        }
    } else if name.eq_ignore_ascii_case("PPQ") {
        match parse_decimal(text) {
            Some(ticks) => effects.push(Effect::TempoPosition(ticks)),
            None => effects.push(malformed("PPQ", text)),
        }
    } else if name.eq_ignore_ascii_case("Func") {
        match parse_integer(text) {
            Some(func) => effects.push(Effect::TempoRamp(func == 1)),
            None => effects.push(malformed("Func", text)),
        }
    }
}

fn malformed(field: &str, text: &str) -> Effect {
    Effect::Diagnostic(Diagnostic::MalformedNumber {
        field: field.to_string(),
        text: text.to_string(),
    })
}

/// Borrowed view of an open tag and the attributes the walker consults.
struct Element<'a> {
    tag: &'a str,
    attributes: &'a Attributes,
}

impl<'a> Element<'a> {
    fn new(tag: &'a str, attributes: &'a Attributes) -> Self {
        Self { tag, attributes }
    }

    fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    fn is_named(&self, tag: &str, name: &str) -> bool {
        self.is(tag) && self.name().is_some_and(|value| value.eq_ignore_ascii_case(name))
    }

    fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes.get(key)
    }

    fn class(&self) -> Option<&'a str> {
        self.attribute("class")
    }

    fn class_of_obj(&self) -> Option<&'a str> {
        if self.is("obj") { self.class() } else { None }
    }

    fn name(&self) -> Option<&'a str> {
        self.attribute("name")
    }

    /// The `value` attribute, treating an empty one as absent.
    fn value(&self) -> Option<&'a str> {
        self.attribute("value").filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PendingTempoPoint {
    bpm: Option<f64>,
    tick_position: Option<f64>,
    is_ramp: bool,
}

/// Regions resolved and ordered, before name deduplication.
#[derive(Debug, Clone)]
pub struct WalkOutput {
    pub regions: Vec<RegionDraft>,
    pub dropped: usize,
    pub sample_rate: f64,
    pub tempo_curve: TempoCurve,
    pub diagnostics: Vec<Diagnostic>,
}

impl WalkOutput {
    /// Deduplicates region names and hands the result over.
    #[must_use]
    pub fn into_extraction(mut self) -> Extraction {
        let renamed = resolve_names(&mut self.regions);
        Extraction {
            regions: self.regions,
            renamed,
            dropped: self.dropped,
            sample_rate: self.sample_rate,
            tempo_curve: self.tempo_curve,
            diagnostics: self.diagnostics,
        }
    }
}

/// The ordered, uniquely named regions of one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub regions: Vec<RegionDraft>,
    pub renamed: usize,
    pub dropped: usize,
    pub sample_rate: f64,
    pub tempo_curve: TempoCurve,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    #[must_use]
    pub fn records(&self) -> Vec<Region> {
        self.regions.iter().map(RegionDraft::to_region).collect()
    }
}

#[derive(Debug, Default)]
pub struct DocumentWalker {
    state: WalkerState,
    tempo_curve: TempoCurve,
    drafts: Vec<RegionDraft>,
    current: Option<RegionDraft>,
    pending_tempo: Option<PendingTempoPoint>,
    clip_names: HashMap<String, String>,
    sample_rate: Option<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl DocumentWalker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &WalkerState {
        &self.state
    }

    #[must_use]
    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of regions whose element has closed so far.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.drafts.len()
    }

    pub fn feed(&mut self, event: &ParseEvent) {
        let state = std::mem::take(&mut self.state);
        let (next, effects) = state.step(event);
        self.state = next;
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::EnterTrack(kind) => debug!(?kind, "entering track"),
            Effect::ExitTrack(kind) => debug!(?kind, "leaving track"),
            Effect::DomainChanged(domain) => debug!(?domain, "track time domain"),
            Effect::BeginRegion(source) => {
                self.current = Some(RegionDraft::new(source));
            }
            Effect::FinishRegion => {
                if let Some(draft) = self.current.take() {
                    self.drafts.push(draft);
                }
            }
            Effect::SetStart(value) => {
                if let Some(draft) = self.current.as_mut() {
                    draft.set_start_value(value);
                }
            }
            Effect::SetLength(value) => {
                if let Some(draft) = self.current.as_mut() {
                    draft.set_length_value(value);
                }
            }
            Effect::SetName(name) => {
                if let Some(draft) = self.current.as_mut() {
                    draft.set_name(&name);
                }
            }
            Effect::RejectRegion(error) => {
                if let Some(draft) = self.current.as_mut() {
                    draft.reject(error);
                }
            }
            Effect::DescribeClip { id, name } => self.describe_clip(id, &name),
            Effect::ReferenceClip { id } => {
                if let (Some(name), Some(draft)) = (self.clip_names.get(&id), self.current.as_mut())
                {
                    draft.set_fallback_name(name);
                }
            }
            Effect::BeginTempoPoint => {
                self.pending_tempo = Some(PendingTempoPoint::default());
            }
            Effect::TempoBpm(bpm) => {
                if let Some(pending) = self.pending_tempo.as_mut() {
                    pending.bpm = Some(bpm);
                }
            }
            Effect::TempoPosition(ticks) => {
                if let Some(pending) = self.pending_tempo.as_mut() {
                    pending.tick_position = Some(ticks);
                }
            }
            Effect::TempoRamp(is_ramp) => {
                if let Some(pending) = self.pending_tempo.as_mut() {
                    pending.is_ramp = is_ramp;
                }
            }
            Effect::EndTempoPoint => self.end_tempo_point(),
            Effect::SampleRate(rate) => {
                self.sample_rate = Some(rate);
                info!(sample_rate = rate, "project sample rate read");
            }
            Effect::RehearsalTempo(bpm) => self.tempo_curve.set_rehearsal_tempo(bpm),
            Effect::RehearsalMode(enabled) => self.tempo_curve.set_rehearsal_mode(enabled),
            Effect::Diagnostic(diagnostic) => self.record(diagnostic),
        }
    }

    fn describe_clip(&mut self, id: Option<String>, name: &str) {
        match id {
            Some(id) if self.clip_names.contains_key(&id) => {
                self.record(Diagnostic::DuplicateClipId { id });
            }
            Some(id) => {
                self.clip_names.insert(id, name.to_string());
                if let Some(draft) = self.current.as_mut() {
                    draft.set_fallback_name(name);
                }
            }
            None => {
                if let Some(draft) = self.current.as_mut() {
                    draft.set_fallback_name(name);
                }
            }
        }
    }

    fn end_tempo_point(&mut self) {
        let Some(pending) = self.pending_tempo.take() else {
            return;
        };
        match (pending.tick_position, pending.bpm) {
            (Some(tick_position), Some(bpm)) => {
                self.tempo_curve
                    .append_point(tick_position, bpm, pending.is_ramp);
                debug!(tick_position, bpm, is_ramp = pending.is_ramp, "tempo point read");
            }
            (tick_position, bpm) => {
                self.record(Diagnostic::IncompleteTempoPoint { bpm, tick_position });
            }
        }
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.trace();
        self.diagnostics.push(diagnostic);
    }

    /// Finalizes the tempo curve, resolves every collected region and orders
    /// the survivors by start time (parse order breaks ties).
    #[instrument(skip(self), fields(collected = self.drafts.len()))]
    pub fn finish(mut self) -> Result<WalkOutput, WalkError> {
        if let Some(content) = self.state.content.active_kind() {
            self.record(Diagnostic::UnterminatedElement { content });
        }

        let sample_rate = self.sample_rate.ok_or(WalkError::MissingSampleRate)?;
        if !self.tempo_curve.is_populated() {
            return Err(WalkError::EmptyTempoCurve);
        }
        if self.tempo_curve.uses_rehearsal_tempo() && !self.tempo_curve.has_rehearsal_tempo() {
            let bpm = self.tempo_curve.rehearsal_tempo();
            self.record(Diagnostic::RehearsalTempoDefaulted { bpm });
        }
        self.tempo_curve
            .finalize()
            .map_err(|_| WalkError::EmptyTempoCurve)?;
        if !self.tempo_curve.uses_rehearsal_tempo() {
            if let Some(first) = self.tempo_curve.points().first() {
                if first.tick_position != 0.0 {
                    let tick_position = first.tick_position;
                    self.record(Diagnostic::FirstTempoPointNotAtZero { tick_position });
                }
            }
        }

        let drafts = std::mem::take(&mut self.drafts);
        let mut regions = Vec::with_capacity(drafts.len());
        let mut dropped = 0;
        for (index, mut draft) in drafts.into_iter().enumerate() {
            match draft.resolve(Some(sample_rate), &self.tempo_curve) {
                Ok(()) => regions.push(draft),
                Err(reason) => {
                    dropped += 1;
                    self.record(Diagnostic::region_dropped(index, draft.name(), &reason));
                }
            }
        }
        regions.sort_by(|left, right| left.start_seconds().total_cmp(&right.start_seconds()));

        info!(regions = regions.len(), dropped, "document walk finished");
        Ok(WalkOutput {
            regions,
            dropped,
            sample_rate,
            tempo_curve: self.tempo_curve,
            diagnostics: self.diagnostics,
        })
    }
}

/// Walks a complete event sequence and deduplicates the region names.
pub fn extract_regions<'a>(
    events: impl IntoIterator<Item = &'a ParseEvent>,
) -> Result<Extraction, WalkError> {
    let mut walker = DocumentWalker::new();
    for event in events {
        walker.feed(event);
    }
    Ok(walker.finish()?.into_extraction())
}
