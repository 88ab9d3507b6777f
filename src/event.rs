//! Control events and partial-match patterns
//!
//! An [`Event`] is what the transport hands to the dispatcher: a fixed set of
//! scalar fields per event type. A [`Pattern`] is a partial view over the
//! same fields; it matches every event that carries all of its pairs.

use crate::error::InvalidPatternError;
use crate::midi::MidiMessage;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of control event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    ControlChange,
    NoteOn,
    NoteOff,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ControlChange => "control_change",
            EventType::NoteOn => "note_on",
            EventType::NoteOff => "note_off",
        }
    }

    /// Parse from the schema name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "control_change" => Some(EventType::ControlChange),
            "note_on" => Some(EventType::NoteOn),
            "note_off" => Some(EventType::NoteOff),
            _ => None,
        }
    }

    /// Fields carried by events of this type
    pub fn fields(&self) -> &'static [Field] {
        match self {
            EventType::ControlChange => &[Field::Type, Field::Channel, Field::Control, Field::Value],
            EventType::NoteOn | EventType::NoteOff => {
                &[Field::Type, Field::Channel, Field::Note, Field::Velocity]
            }
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event field name
///
/// Variants are declared in name order so that a `BTreeMap<Field, _>` is the
/// canonical, sorted form of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Channel,
    Control,
    Note,
    Type,
    Value,
    Velocity,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Channel,
        Field::Control,
        Field::Note,
        Field::Type,
        Field::Value,
        Field::Velocity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Channel => "channel",
            Field::Control => "control",
            Field::Note => "note",
            Field::Type => "type",
            Field::Value => "value",
            Field::Velocity => "velocity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|field| field.as_str() == s)
    }

    /// Upper bound for numeric fields, `None` for `type`
    fn limit(&self) -> Option<u8> {
        match self {
            Field::Type => None,
            Field::Channel => Some(15),
            _ => Some(127),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single event field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Type(EventType),
    Number(u8),
}

impl From<EventType> for Scalar {
    fn from(value: EventType) -> Self {
        Scalar::Type(value)
    }
}

impl From<u8> for Scalar {
    fn from(value: u8) -> Self {
        Scalar::Number(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Type(t) => write!(f, "{}", t),
            Scalar::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Immutable control event delivered by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    ControlChange { channel: u8, control: u8, value: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::ControlChange { .. } => EventType::ControlChange,
            Event::NoteOn { .. } => EventType::NoteOn,
            Event::NoteOff { .. } => EventType::NoteOff,
        }
    }

    /// Look up a field; `None` if this event type does not carry it
    pub fn get(&self, field: Field) -> Option<Scalar> {
        match (*self, field) {
            (_, Field::Type) => Some(Scalar::Type(self.event_type())),
            (Event::ControlChange { channel, .. }, Field::Channel)
            | (Event::NoteOn { channel, .. }, Field::Channel)
            | (Event::NoteOff { channel, .. }, Field::Channel) => Some(Scalar::Number(channel)),
            (Event::ControlChange { control, .. }, Field::Control) => Some(Scalar::Number(control)),
            (Event::ControlChange { value, .. }, Field::Value) => Some(Scalar::Number(value)),
            (Event::NoteOn { note, .. }, Field::Note) | (Event::NoteOff { note, .. }, Field::Note) => {
                Some(Scalar::Number(note))
            }
            (Event::NoteOn { velocity, .. }, Field::Velocity)
            | (Event::NoteOff { velocity, .. }, Field::Velocity) => Some(Scalar::Number(velocity)),
            _ => None,
        }
    }

    /// All (field, value) pairs of the event
    pub fn fields(&self) -> impl Iterator<Item = (Field, Scalar)> + '_ {
        self.event_type()
            .fields()
            .iter()
            .filter_map(move |&field| self.get(field).map(|value| (field, value)))
    }
}

impl From<MidiMessage> for Event {
    fn from(msg: MidiMessage) -> Self {
        match msg {
            MidiMessage::ControlChange { channel, cc, value } => Event::ControlChange {
                channel,
                control: cc,
                value,
            },
            MidiMessage::NoteOn { channel, note, velocity } => Event::NoteOn {
                channel,
                note,
                velocity,
            },
            MidiMessage::NoteOff { channel, note, velocity } => Event::NoteOff {
                channel,
                note,
                velocity,
            },
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self
            .fields()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Untyped pattern value for [`Pattern::from_pairs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternValue {
    Number(i64),
    Text(String),
}

impl From<i64> for PatternValue {
    fn from(value: i64) -> Self {
        PatternValue::Number(value)
    }
}

impl From<&str> for PatternValue {
    fn from(value: &str) -> Self {
        PatternValue::Text(value.to_string())
    }
}

/// Partial-match event pattern
///
/// Stored in canonical (field-sorted) form, so two patterns built from the
/// same pairs in a different order compare and hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    fields: BTreeMap<Field, Scalar>,
}

impl Pattern {
    /// Empty pattern, matches every event
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<Scalar>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn event_type(self, event_type: EventType) -> Self {
        self.with(Field::Type, event_type)
    }

    pub fn channel(self, channel: u8) -> Self {
        self.with(Field::Channel, channel)
    }

    pub fn control(self, control: u8) -> Self {
        self.with(Field::Control, control)
    }

    pub fn note(self, note: u8) -> Self {
        self.with(Field::Note, note)
    }

    pub fn value(self, value: u8) -> Self {
        self.with(Field::Value, value)
    }

    pub fn velocity(self, velocity: u8) -> Self {
        self.with(Field::Velocity, velocity)
    }

    /// Build a pattern from untyped (name, value) pairs
    pub fn from_pairs<K, I>(pairs: I) -> Result<Self, InvalidPatternError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, PatternValue)>,
    {
        let mut fields = BTreeMap::new();
        for (name, raw) in pairs {
            let name = name.as_ref();
            let field =
                Field::parse(name).ok_or_else(|| InvalidPatternError::UnknownField(name.to_string()))?;

            let scalar = match (field, raw) {
                (Field::Type, PatternValue::Text(text)) => Scalar::Type(
                    EventType::parse(&text).ok_or(InvalidPatternError::UnknownType(text))?,
                ),
                (Field::Type, PatternValue::Number(_)) => {
                    return Err(InvalidPatternError::WrongKind {
                        field: field.as_str(),
                        expected: "an event type name",
                    })
                }
                (_, PatternValue::Number(n)) => {
                    let max = field.limit().unwrap_or(127);
                    let value = u8::try_from(n)
                        .ok()
                        .filter(|v| *v <= max)
                        .ok_or(InvalidPatternError::OutOfRange {
                            field: field.as_str(),
                            value: n,
                            max,
                        })?;
                    Scalar::Number(value)
                }
                (_, PatternValue::Text(_)) => {
                    return Err(InvalidPatternError::WrongKind {
                        field: field.as_str(),
                        expected: "an integer",
                    })
                }
            };
            fields.insert(field, scalar);
        }

        let pattern = Self { fields };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Check the pattern against the event schema
    pub fn validate(&self) -> Result<(), InvalidPatternError> {
        for (&field, &value) in &self.fields {
            match (field, value, field.limit()) {
                (Field::Type, Scalar::Type(_), _) => {}
                (Field::Type, Scalar::Number(_), _) => {
                    return Err(InvalidPatternError::WrongKind {
                        field: field.as_str(),
                        expected: "an event type name",
                    })
                }
                (_, Scalar::Type(_), _) => {
                    return Err(InvalidPatternError::WrongKind {
                        field: field.as_str(),
                        expected: "an integer",
                    })
                }
                (_, Scalar::Number(n), Some(max)) if n > max => {
                    return Err(InvalidPatternError::OutOfRange {
                        field: field.as_str(),
                        value: i64::from(n),
                        max,
                    })
                }
                _ => {}
            }
        }

        if let Some(Scalar::Type(event_type)) = self.fields.get(&Field::Type) {
            let allowed = event_type.fields();
            if let Some(field) = self.fields.keys().find(|f| !allowed.contains(f)) {
                return Err(InvalidPatternError::FieldNotInType {
                    field: field.as_str(),
                    event_type: event_type.as_str(),
                });
            }
        }

        Ok(())
    }

    /// Subset-equality test: every pair of the pattern is present in the event
    pub fn matches(&self, event: &Event) -> bool {
        self.fields
            .iter()
            .all(|(&field, value)| event.get(field).as_ref() == Some(value))
    }

    pub fn get(&self, field: Field) -> Option<Scalar> {
        self.fields.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Field, Scalar)> + '_ {
        self.fields.iter().map(|(&f, &v)| (f, v))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_on(channel: u8, note: u8, velocity: u8) -> Event {
        Event::NoteOn {
            channel,
            note,
            velocity,
        }
    }

    #[test]
    fn test_partial_match() {
        let pattern = Pattern::new()
            .event_type(EventType::NoteOn)
            .channel(0)
            .note(0);

        assert!(pattern.matches(&note_on(0, 0, 64)));
        assert!(!pattern.matches(&note_on(0, 1, 64)));
        assert!(!pattern.matches(&note_on(1, 0, 64)));
        assert!(!pattern.matches(&Event::NoteOff {
            channel: 0,
            note: 0,
            velocity: 0
        }));
    }

    #[test]
    fn test_field_missing_from_event_never_matches() {
        let pattern = Pattern::new().control(7);
        assert!(!pattern.matches(&note_on(0, 7, 7)));
        assert!(pattern.matches(&Event::ControlChange {
            channel: 3,
            control: 7,
            value: 0
        }));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        assert!(Pattern::new().matches(&note_on(5, 5, 5)));
    }

    #[test]
    fn test_canonical_form_ignores_insertion_order() {
        let a = Pattern::new().note(3).channel(0).event_type(EventType::NoteOn);
        let b = Pattern::new().event_type(EventType::NoteOn).channel(0).note(3);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{channel=0, note=3, type=note_on}");
    }

    #[test]
    fn test_from_pairs() {
        let pattern = Pattern::from_pairs([
            ("type", PatternValue::from("control_change")),
            ("channel", PatternValue::from(0)),
            ("control", PatternValue::from(16)),
        ])
        .unwrap();

        assert_eq!(
            pattern,
            Pattern::new()
                .event_type(EventType::ControlChange)
                .channel(0)
                .control(16)
        );
    }

    #[test]
    fn test_from_pairs_rejects_unknown_field() {
        let err = Pattern::from_pairs([("pitch", PatternValue::from(3))]).unwrap_err();
        assert_eq!(err, InvalidPatternError::UnknownField("pitch".to_string()));
    }

    #[test]
    fn test_from_pairs_rejects_bad_values() {
        assert_eq!(
            Pattern::from_pairs([("type", PatternValue::from("sysex"))]).unwrap_err(),
            InvalidPatternError::UnknownType("sysex".to_string())
        );
        assert!(matches!(
            Pattern::from_pairs([("channel", PatternValue::from(16))]),
            Err(InvalidPatternError::OutOfRange { field: "channel", .. })
        ));
        assert!(matches!(
            Pattern::from_pairs([("note", PatternValue::from(-1))]),
            Err(InvalidPatternError::OutOfRange { field: "note", .. })
        ));
        assert!(matches!(
            Pattern::from_pairs([("note", PatternValue::from("C4"))]),
            Err(InvalidPatternError::WrongKind { field: "note", .. })
        ));
    }

    #[test]
    fn test_numeric_limits_per_field() {
        assert_eq!(Field::Channel.limit(), Some(15));
        assert_eq!(Field::Velocity.limit(), Some(127));
        assert_eq!(Field::Type.limit(), None);

        assert!(Pattern::new().channel(15).note(127).validate().is_ok());
        assert_eq!(
            Pattern::new().channel(16).validate(),
            Err(InvalidPatternError::OutOfRange {
                field: "channel",
                value: 16,
                max: 15
            })
        );
        assert_eq!(
            Pattern::new().value(128).validate(),
            Err(InvalidPatternError::OutOfRange {
                field: "value",
                value: 128,
                max: 127
            })
        );
        let pattern = Pattern::from_pairs([("channel", PatternValue::from(9))]).unwrap();
        assert_eq!(pattern.get(Field::Channel), Some(Scalar::Number(9)));
    }

    #[test]
    fn test_validate_field_against_type() {
        let pattern = Pattern::new().event_type(EventType::ControlChange).note(3);
        assert_eq!(
            pattern.validate(),
            Err(InvalidPatternError::FieldNotInType {
                field: "note",
                event_type: "control_change"
            })
        );

        let pattern = Pattern::new().with(Field::Channel, EventType::NoteOn);
        assert!(matches!(
            pattern.validate(),
            Err(InvalidPatternError::WrongKind { field: "channel", .. })
        ));
    }

    #[test]
    fn test_event_from_midi() {
        let event = Event::from(MidiMessage::ControlChange {
            channel: 0,
            cc: 16,
            value: 99,
        });
        assert_eq!(event.get(Field::Control), Some(Scalar::Number(16)));
        assert_eq!(event.get(Field::Value), Some(Scalar::Number(99)));
        assert_eq!(event.get(Field::Note), None);
        assert_eq!(event.to_string(), "{type=control_change, channel=0, control=16, value=99}");
    }
}
