//! Non-repeating prompt draws per game

use rand::Rng;

/// Built-in prompt catalog
pub const STANDARD_PROMPTS: &[&str] = &[
    "The worst thing to hear from your dentist",
    "A terrible name for a cruise ship",
    "What the moon is secretly thinking",
    "The real reason dinosaurs went extinct",
    "A bad slogan for a funeral home",
    "Something you should never say at a job interview",
    "The least popular ice cream flavour",
    "What your cat does when you leave the house",
    "A rejected superhero power",
    "The worst thing to find in a sandwich",
    "A new law that would make Mondays better",
    "The title of a very boring autobiography",
    "A surprising thing to keep in your pocket",
    "What aliens would complain about on Earth",
    "A bad name for a racehorse",
    "The worst wedding gift",
    "A fortune cookie message that ruins your day",
    "An unnecessary kitchen gadget",
    "The secret ingredient in grandma's soup",
    "What pigeons are plotting",
    "A terrible theme for a birthday party",
    "The worst password imaginable",
    "A sport that should be in the Olympics",
    "What the last text message on Earth will say",
    "A shocking thing to find in the attic",
    "The worst advice a life coach could give",
    "A rejected board game",
    "What a ghost does on its day off",
    "An alarming sign to see in a hospital",
    "The least intimidating battle cry",
    "A snack that should not exist",
    "The worst thing to shout in a library",
    "What robots dream about",
    "A new holiday nobody asked for",
    "The worst possible tattoo",
    "A strange thing to collect",
    "A weird reason to call the police",
    "The most useless superpower",
    "What the goldfish is really thinking",
    "A bad thing to name your boat",
];

/// Draws prompt texts without replacement, refilling once exhausted
#[derive(Debug, Clone, Copy)]
pub struct PromptPool {
    catalog: &'static [&'static str],
}

impl Default for PromptPool {
    fn default() -> Self {
        Self::new(STANDARD_PROMPTS)
    }
}

impl PromptPool {
    /// `catalog` must not be empty
    pub fn new(catalog: &'static [&'static str]) -> Self {
        assert!(!catalog.is_empty(), "prompt catalog must not be empty");
        Self { catalog }
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Draw `count` prompt texts, recording the drawn indices in `used`.
    /// When every index is used the pool refills mid-draw, so repeats within a
    /// game only happen after exhaustion.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        used: &mut Vec<usize>,
        count: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let mut picked = Vec::with_capacity(count);

        for _ in 0..count {
            let mut unused: Vec<usize> = (0..self.catalog.len())
                .filter(|i| !used.contains(i))
                .collect();

            if unused.is_empty() {
                tracing::debug!("Prompt pool exhausted, refilling {} prompts", self.len());
                used.clear();
                unused = (0..self.catalog.len()).collect();
            }

            let idx = unused[rng.random_range(0..unused.len())];
            used.push(idx);
            picked.push(self.catalog[idx].to_string());
        }

        picked
    }
}
