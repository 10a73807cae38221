//! Instruction text sent with each generation call
//!
//! Three tiers keyed by attempt index. Each later tier restates the same
//! constraints more forcefully: keep the first image's person and setting,
//! transfer only the garment from the second image.

/// Garment identity used to fill the instruction templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarmentInfo {
    /// Display name, e.g. "red sequined dress"
    pub name: String,
    /// Category label, e.g. "dress"
    pub category: String,
}

impl GarmentInfo {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Escalation tier of a try-on instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTier {
    Baseline,
    Strict,
    Final,
}

impl PromptTier {
    /// Tier for a zero-based attempt index; 2 and above share the final tier
    pub fn for_attempt(attempt: u32) -> Self {
        match attempt {
            0 => PromptTier::Baseline,
            1 => PromptTier::Strict,
            _ => PromptTier::Final,
        }
    }
}

/// Build the try-on instruction for an attempt
pub fn try_on_prompt(attempt: u32, garment: &GarmentInfo) -> String {
    match PromptTier::for_attempt(attempt) {
        PromptTier::Baseline => baseline(garment),
        PromptTier::Strict => strict(garment),
        PromptTier::Final => final_tier(garment),
    }
}

fn baseline(g: &GarmentInfo) -> String {
    format!(
        "VIRTUAL TRY-ON: dress the person in the FIRST image in the {name} ({category}) shown in the SECOND image.

BACKGROUND PRESERVATION (highest priority):
- Keep the background, walls, floor, lighting and setting of the FIRST image exactly as they are
- Take nothing from the SECOND image except the {name}
- The person stays in their original room

CLOTHING REPLACEMENT:
- Remove only the clothing the person is wearing and replace it with the {name}
- Fit the garment naturally to the body with realistic draping
- Match the garment's color, pattern and texture exactly

PRESERVE:
- Face, hair, skin tone and body proportions
- Image composition, framing and light direction

PROHIBITED:
- Backgrounds, architecture, furniture or lighting from the SECOND image
- Composite or mixed settings

RESULT: a natural, high-quality photo of the same person in the same place, wearing the {name}.",
        name = g.name,
        category = g.category,
    )
}

fn strict(g: &GarmentInfo) -> String {
    format!(
        "RETRY: STRICT IMAGE SEPARATION

The previous attempt did not change the clothing or mixed the two images.

1. FIRST IMAGE: use everything from it (person, background, lighting, room)
2. SECOND IMAGE: extract ONLY the {name} ({category}), ignore everything else
3. No stairs, railings, rooms or backdrops from the SECOND image
4. The person must visibly wear the {name}; returning the first image unchanged is a failure

GOAL: the person wearing the {name} in their original room, with no environmental mixing.",
        name = g.name,
        category = g.category,
    )
}

fn final_tier(g: &GarmentInfo) -> String {
    format!(
        "FINAL ATTEMPT: ABSOLUTE IMAGE SEPARATION

- FOUNDATION: 100% of the environment, background and lighting come from the FIRST image
- GARMENT ONLY: take the fabric, color, pattern and design of the {name} ({category}) from the SECOND image
- The SECOND image's background must not appear anywhere in the result
- The clothing MUST change to the {name}

SUCCESS CRITERIA:
- Background matches the FIRST image exactly
- Garment is the {name} from the SECOND image
- Person's identity and proportions are preserved

FAILURE = unchanged clothing or background contamination from the SECOND image.",
        name = g.name,
        category = g.category,
    )
}

/// Fixed instruction for the secondary enhancement pass
pub fn cleanup_prompt(garment_name: &str) -> String {
    format!(
        "ENHANCEMENT PASS: refine the virtual try-on result (SECOND image) using the original photo (FIRST image) as reference.

PRESERVE (highest priority):
- The exact background, setting and lighting of the original photo
- The person's identity

REFINE:
- Garment draping and fit of the {name}, with realistic fabric behavior
- Blend garment edges into the body and add natural contact shadows
- Remove segmentation artifacts
- Gentle, natural skin and lighting refinement

PROHIBITED:
- Changing the background, room or lighting setup
- Adding environmental elements that are not in the original photo

RESULT: the same image, cleaner and more natural, with the person wearing the {name}.",
        name = garment_name,
    )
}
