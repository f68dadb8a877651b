//! Simulated data source used while no INDI connection is live

use crate::property::{DataRange, Value};
use crate::table::PropertyMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Advances every record of a module by one simulated step
pub trait Simulator: Send {
    fn step(&mut self, records: &mut PropertyMap);
}

impl<F> Simulator for F
where
    F: FnMut(&mut PropertyMap) + Send,
{
    fn step(&mut self, records: &mut PropertyMap) {
        self(records)
    }
}

/// Bounded random walk.
///
/// Numbers wander by up to a tenth of their range per step and may stray a
/// little outside it, so cold and hot states show up on screen. Choice
/// records occasionally jump to another allowed value. Text and binary
/// records are left alone.
pub struct RandomWalk {
    rng: StdRng,
}

impl RandomWalk {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn walk(&mut self, value: f64, range: Option<&DataRange>) -> f64 {
        match range {
            Some(DataRange::Interval { min, max }) => {
                let span = (max - min).abs().max(f64::EPSILON);
                let next = value + self.rng.gen_range(-0.1..=0.1) * span;
                next.clamp(min - span * 0.15, max + span * 0.15)
            }
            _ => {
                let scale = (value.abs() * 0.05).max(0.1);
                value + self.rng.gen_range(-1.0..=1.0) * scale
            }
        }
    }
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator for RandomWalk {
    fn step(&mut self, records: &mut PropertyMap) {
        for (_, record) in records.iter_mut() {
            if let Some(DataRange::Choices(choices)) = &record.datarange {
                if self.rng.gen_bool(0.2) {
                    if let Some(choice) = choices.choose(&mut self.rng) {
                        if let Ok(value) = choice.coerce(record.datatype) {
                            record.actval = value;
                        }
                    }
                }
                continue;
            }

            let next = match &record.actval {
                Value::Float(v) => Value::Float(self.walk(*v, record.datarange.as_ref())),
                Value::Int(v) => {
                    Value::Int(self.walk(*v as f64, record.datarange.as_ref()).round() as i64)
                }
                Value::Bool(v) => Value::Bool(if self.rng.gen_bool(0.1) { !v } else { *v }),
                Value::Binary(_) | Value::Text(_) => continue,
            };
            record.actval = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::DataType;
    use crate::table::PropertyRecord;

    fn records() -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert(
            "d.p.f",
            PropertyRecord {
                datatype: DataType::Float,
                datarange: Some(DataRange::Interval { min: 10.0, max: 20.0 }),
                actval: Value::Float(15.0),
                ..Default::default()
            },
        )
        .unwrap();
        m.insert(
            "d.p.c",
            PropertyRecord {
                datatype: DataType::Int,
                datarange: Some(DataRange::Choices(vec![Value::Int(1), Value::Int(2)])),
                actval: Value::Int(1),
                ..Default::default()
            },
        )
        .unwrap();
        m.insert(
            "d.p.t",
            PropertyRecord {
                actval: Value::Text("fixed".into()),
                ..Default::default()
            },
        )
        .unwrap();
        m
    }

    #[test]
    fn test_random_walk_stays_near_range() {
        let mut sim = RandomWalk::seeded(7);
        let mut m = records();
        for _ in 0..500 {
            sim.step(&mut m);
            let v = m.get("d.p.f").unwrap().actval.as_f64().unwrap();
            assert!((8.5..=21.5).contains(&v), "walked to {}", v);
            let c = &m.get("d.p.c").unwrap().actval;
            assert!(*c == Value::Int(1) || *c == Value::Int(2));
        }
        assert_eq!(m.get("d.p.t").unwrap().actval, Value::Text("fixed".into()));
    }

    #[test]
    fn test_closure_simulator() {
        let mut m = records();
        let mut sim = |records: &mut PropertyMap| {
            if let Some(r) = records.get_mut("d.p.f") {
                r.actval = Value::Float(99.0);
            }
        };
        Simulator::step(&mut sim, &mut m);
        assert_eq!(m.get("d.p.f").unwrap().actval, Value::Float(99.0));
    }
}
