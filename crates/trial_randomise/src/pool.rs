//! Resource label pools.
//!
//! A pool holds the labels of one `(scope, arm)` key. Labels are generated
//! as `prefix + arm code + separator + zero-padded ordinal`, shuffled once,
//! then withdrawn from the head without replacement.
//!
//! The scope is the projection of a participant's stratum onto the pool
//! scope dimensions. With scope `["site"]`, men and women of the same site
//! and arm draw from one pool:
//!
//! ```text
//! (site=1, Tratamento) -> centro_1_T001 .. centro_1_T018
//! (site=1, Placebo)    -> centro_1_P001 .. centro_1_P018
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::debug;
use trial_core::rng::TrialRng;
use trial_core::types::{Arm, ArmRatio, Dimension, LabelSlots, Participant, StratumKey};
use trial_core::{ConfigError, RandomisationError};

use crate::demand::{ConsumptionRates, PoolDemand};

/// Widest ordinal padding accepted by [`LabelScheme`].
pub const MAX_ORDINAL_WIDTH: usize = 9;

/// Composite key of a label pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolKey {
    scope: StratumKey,
    arm: Arm,
}

impl PoolKey {
    /// Creates a pool key.
    pub fn new(scope: StratumKey, arm: Arm) -> Self {
        Self { scope, arm }
    }

    /// Scope part of the key.
    #[inline]
    pub fn scope(&self) -> &StratumKey {
        &self.scope
    }

    /// Arm part of the key.
    #[inline]
    pub fn arm(&self) -> &Arm {
        &self.arm
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.scope, self.arm)
    }
}

/// Dimensions that key a label pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolScope {
    dimensions: Vec<String>,
}

impl PoolScope {
    /// Scope over the named dimensions.
    pub fn new<I, S>(dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Every declared dimension except the consumption dimension.
    pub fn excluding_consumption(dimensions: &[Dimension], rates: &ConsumptionRates) -> Self {
        Self::new(
            dimensions
                .iter()
                .map(Dimension::name)
                .filter(|name| Some(*name) != rates.dimension()),
        )
    }

    /// Scope dimension names.
    #[inline]
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Checks that every scope dimension is declared, once.
    pub fn validate(&self, dimensions: &[Dimension]) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for name in &self.dimensions {
            if !dimensions.iter().any(|d| d.name() == name) {
                return Err(ConfigError::UnknownDimension {
                    context: "Pool scope",
                    name: name.clone(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::InvalidParameter {
                    name: "labels.scope",
                    value: format!("dimension '{}' listed more than once", name),
                });
            }
        }
        Ok(())
    }

    /// Scope key of a stratum.
    pub fn project(&self, stratum: &StratumKey) -> StratumKey {
        stratum.project(&self.dimensions)
    }

    /// Pool key for a participant in `stratum` assigned to `arm`.
    pub fn key_for(&self, stratum: &StratumKey, arm: &Arm) -> PoolKey {
        PoolKey::new(self.project(stratum), arm.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Naming scheme for resource labels.
///
/// # Examples
///
/// ```rust
/// use trial_core::types::{Arm, StratumKey};
/// use trial_randomise::pool::LabelScheme;
///
/// let scheme = LabelScheme::new("centro_{site}_", "", 3).unwrap();
/// let scope = StratumKey::root().child("site", "2");
/// let prefix = scheme.render_prefix(&scope).unwrap();
///
/// assert_eq!(scheme.label(&prefix, &Arm::new("Placebo"), 7), "centro_2_P007");
///
/// let flat = LabelScheme::new("", "-", 3).unwrap();
/// assert_eq!(flat.label("", &Arm::new("Tratamento"), 12), "T-012");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelScheme {
    prefix_template: String,
    segments: Vec<Segment>,
    separator: String,
    ordinal_width: usize,
}

impl Default for LabelScheme {
    fn default() -> Self {
        Self {
            prefix_template: String::new(),
            segments: Vec::new(),
            separator: String::new(),
            ordinal_width: 3,
        }
    }
}

impl LabelScheme {
    /// Creates a scheme.
    ///
    /// `prefix_template` may contain `{dimension}` placeholders, rendered
    /// from the pool scope.
    ///
    /// # Errors
    ///
    /// - `InvalidLabelTemplate` for unbalanced or empty placeholders
    /// - `InvalidParameter` if `ordinal_width` is outside `[1, 9]`
    pub fn new(
        prefix_template: impl Into<String>,
        separator: impl Into<String>,
        ordinal_width: usize,
    ) -> Result<Self, ConfigError> {
        let prefix_template = prefix_template.into();
        if ordinal_width == 0 || ordinal_width > MAX_ORDINAL_WIDTH {
            return Err(ConfigError::InvalidParameter {
                name: "ordinal_width",
                value: format!(
                    "{} must be in range [1, {}]",
                    ordinal_width, MAX_ORDINAL_WIDTH
                ),
            });
        }
        let segments = parse_template(&prefix_template)?;
        Ok(Self {
            prefix_template,
            segments,
            separator: separator.into(),
            ordinal_width,
        })
    }

    /// Prefix template as configured.
    #[inline]
    pub fn prefix_template(&self) -> &str {
        &self.prefix_template
    }

    /// Zero-padding width of the ordinal.
    #[inline]
    pub fn ordinal_width(&self) -> usize {
        self.ordinal_width
    }

    /// Fills an empty prefix template with one `{dimension}_` placeholder
    /// per scope dimension; a non-empty template is kept as is.
    ///
    /// ```rust
    /// use trial_randomise::pool::{LabelScheme, PoolScope};
    ///
    /// let scheme = LabelScheme::default().resolve_prefix(&PoolScope::new(["site", "gender"]));
    /// assert_eq!(scheme.prefix_template(), "{site}_{gender}_");
    /// ```
    pub fn resolve_prefix(mut self, scope: &PoolScope) -> Self {
        if !self.prefix_template.is_empty() {
            return self;
        }
        for dimension in scope.dimensions() {
            self.prefix_template.push_str(&format!("{{{}}}_", dimension));
            self.segments.push(Segment::Placeholder(dimension.clone()));
            self.segments.push(Segment::Literal("_".to_string()));
        }
        self
    }

    /// Checks that placeholders and scope dimensions match one to one.
    ///
    /// A scope dimension missing from the template would give two pools
    /// the same prefix.
    pub fn validate(&self, scope: &PoolScope) -> Result<(), ConfigError> {
        let placeholders: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();

        for name in &placeholders {
            if !scope.dimensions().iter().any(|d| d == name) {
                return Err(self.invalid(format!(
                    "placeholder '{{{}}}' is not a pool scope dimension",
                    name
                )));
            }
        }
        for dimension in scope.dimensions() {
            if !placeholders.contains(&dimension.as_str()) {
                return Err(self.invalid(format!(
                    "pool scope dimension '{}' has no placeholder",
                    dimension
                )));
            }
        }
        Ok(())
    }

    /// Checks that no two pools can produce the same label.
    ///
    /// Every label is a stem (`prefix + code + separator`) followed by
    /// digits, so two stems clash when they are equal or one extends the
    /// other by digits only.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLabelTemplate` naming the two clashing pools.
    pub fn check_stems<'k>(
        &self,
        scopes: impl IntoIterator<Item = &'k StratumKey>,
        ratio: &ArmRatio,
    ) -> Result<(), ConfigError> {
        let mut stems: HashMap<String, PoolKey> = HashMap::new();
        for scope in scopes {
            let prefix = self.render_prefix(scope)?;
            for arm in ratio.arms() {
                let key = PoolKey::new(scope.clone(), arm.clone());
                let stem = format!("{}{}{}", prefix, arm.code(), self.separator);
                match stems.get(&stem) {
                    Some(other) if other != &key => {
                        return Err(self.clash(other, &key));
                    }
                    Some(_) => {}
                    None => {
                        stems.insert(stem, key);
                    }
                }
            }
        }

        for (stem, key) in &stems {
            let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
            for cut in stem.len() - digits..stem.len() {
                if let Some(other) = stems.get(&stem[..cut]) {
                    return Err(self.clash(other, key));
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> ConfigError {
        ConfigError::InvalidLabelTemplate {
            template: self.prefix_template.clone(),
            reason,
        }
    }

    fn clash(&self, first: &PoolKey, second: &PoolKey) -> ConfigError {
        self.invalid(format!(
            "pools [{}] and [{}] can produce the same label",
            first, second
        ))
    }

    /// Renders the prefix for one pool scope.
    pub fn render_prefix(&self, scope: &StratumKey) -> Result<String, ConfigError> {
        let mut prefix = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prefix.push_str(text),
                Segment::Placeholder(name) => {
                    let value = scope.value(name).ok_or_else(|| ConfigError::InvalidLabelTemplate {
                        template: self.prefix_template.clone(),
                        reason: format!("scope [{}] has no value for '{}'", scope, name),
                    })?;
                    prefix.push_str(value);
                }
            }
        }
        Ok(prefix)
    }

    /// Full label for one ordinal.
    pub fn label(&self, prefix: &str, arm: &Arm, ordinal: usize) -> String {
        format!(
            "{}{}{}{:0width$}",
            prefix,
            arm.code(),
            self.separator,
            ordinal,
            width = self.ordinal_width
        )
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidLabelTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(invalid("nested '{'")),
                        Some(other) => name.push(other),
                        None => return Err(invalid("unterminated placeholder")),
                    }
                }
                if name.is_empty() {
                    return Err(invalid("empty placeholder"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => return Err(invalid("unmatched '}'")),
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Labels of one `(scope, arm)` key.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    key: PoolKey,
    labels: VecDeque<String>,
    generated: usize,
}

impl ResourcePool {
    /// Generates `quantity` labels with ordinals `1..=quantity`, unshuffled.
    pub fn generate(key: PoolKey, prefix: &str, scheme: &LabelScheme, quantity: usize) -> Self {
        let labels = (1..=quantity)
            .map(|ordinal| scheme.label(prefix, key.arm(), ordinal))
            .collect();
        Self {
            key,
            labels,
            generated: quantity,
        }
    }

    /// Shuffles the remaining labels once.
    pub fn shuffle(&mut self, rng: &mut TrialRng) {
        rng.shuffle(self.labels.make_contiguous());
    }

    /// Pool key.
    #[inline]
    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Labels generated for this pool.
    #[inline]
    pub fn generated(&self) -> usize {
        self.generated
    }

    /// Labels still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.labels.len()
    }

    /// Labels withdrawn so far.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.generated - self.labels.len()
    }

    /// Labels still available, in withdrawal order.
    pub fn remaining_labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Withdraws `count` labels from the head of the pool.
    ///
    /// The withdrawal is all-or-nothing: on error the pool is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if fewer than `count` labels remain.
    pub fn withdraw(&mut self, count: usize) -> Result<Vec<String>, RandomisationError> {
        if self.labels.len() < count {
            return Err(RandomisationError::ResourceExhausted {
                pool: self.key.to_string(),
                requested: count,
                available: self.labels.len(),
            });
        }
        Ok(self.labels.drain(..count).collect())
    }
}

/// Owns every pool of a run and hands labels out to participants.
#[derive(Debug, Clone, Default)]
pub struct LabelPoolAllocator {
    pools: Vec<ResourcePool>,
    index: HashMap<PoolKey, usize>,
}

impl LabelPoolAllocator {
    /// Generates and shuffles one pool per demand, in demand order.
    ///
    /// # Errors
    ///
    /// Returns `Config(InvalidLabelTemplate)` if a prefix cannot be rendered
    /// for a scope, or `InvariantViolation` if two demands share a key.
    pub fn generate(
        demands: &[PoolDemand],
        scheme: &LabelScheme,
        rng: &mut TrialRng,
    ) -> Result<Self, RandomisationError> {
        let mut allocator = Self::default();
        for demand in demands {
            let prefix = scheme.render_prefix(demand.key().scope())?;
            let mut pool = ResourcePool::generate(demand.key().clone(), &prefix, scheme, demand.quantity());
            pool.shuffle(rng);

            debug!(
                pool = %pool.key(),
                consumption = demand.consumption(),
                generated = pool.generated(),
                "Label pool generated"
            );

            if allocator
                .index
                .insert(pool.key().clone(), allocator.pools.len())
                .is_some()
            {
                return Err(RandomisationError::invariant(format!(
                    "duplicate label pool [{}]",
                    pool.key()
                )));
            }
            allocator.pools.push(pool);
        }
        Ok(allocator)
    }

    /// Pools in generation order.
    #[inline]
    pub fn pools(&self) -> &[ResourcePool] {
        &self.pools
    }

    /// Pool for `key`, if one was generated.
    pub fn pool(&self, key: &PoolKey) -> Option<&ResourcePool> {
        self.index.get(key).map(|&i| &self.pools[i])
    }

    /// Withdraws `count` labels from the pool of `key`.
    ///
    /// A zero-count withdrawal succeeds even without a pool.
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if the pool is missing or too small.
    pub fn withdraw(&mut self, key: &PoolKey, count: usize) -> Result<LabelSlots, RandomisationError> {
        if count == 0 {
            return Ok(LabelSlots::empty());
        }
        let Some(&index) = self.index.get(key) else {
            return Err(RandomisationError::ResourceExhausted {
                pool: key.to_string(),
                requested: count,
                available: 0,
            });
        };
        let labels = self.pools[index].withdraw(count)?;
        LabelSlots::from_labels(labels).ok_or_else(|| {
            RandomisationError::invariant(format!(
                "withdrawal of {} labels exceeds the two label fields",
                count
            ))
        })
    }

    /// Allocates labels to every participant in order.
    ///
    /// # Errors
    ///
    /// Stops at the first participant whose pool cannot cover its units.
    pub fn allocate(
        &mut self,
        participants: &[Participant],
        rates: &ConsumptionRates,
        scope: &PoolScope,
    ) -> Result<Vec<LabelSlots>, RandomisationError> {
        participants
            .iter()
            .map(|participant| {
                let units = rates.units_for(participant.stratum())?;
                let key = scope.key_for(participant.stratum(), participant.arm());
                self.withdraw(&key, units as usize)
            })
            .collect()
    }
}
