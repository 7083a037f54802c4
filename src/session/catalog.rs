//! The five fest games as configuration values.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::time::Duration;

use super::{Challenge, GameDefinition, ScoringRule, Tier};
use crate::types::GameId;

/// Truth-or-dare finishes after this many acknowledged challenges
pub const CHALLENGES_REQUIRED: usize = 5;

const RIDDLES: &[(&str, [&str; 4], usize)] = &[
    (
        "I speak without a mouth and hear without ears. I have no body, but I come alive with wind. What am I?",
        ["Echo", "Shadow", "Dream", "Thought"],
        0,
    ),
    (
        "The more you take, the more you leave behind. What am I?",
        ["Memories", "Footsteps", "Photos", "Time"],
        1,
    ),
    (
        "What has keys but no locks, space but no room, and you can enter but can't go inside?",
        ["Piano", "Map", "Keyboard", "House"],
        2,
    ),
    (
        "I'm tall when I'm young, and I'm short when I'm old. What am I?",
        ["Tree", "Candle", "Person", "Building"],
        1,
    ),
    (
        "What can travel around the world while staying in the corner?",
        ["Letter", "Stamp", "Plane", "Internet"],
        1,
    ),
    (
        "What has a head and a tail but no body?",
        ["Snake", "Coin", "Arrow", "River"],
        1,
    ),
    (
        "What gets wetter the more it dries?",
        ["Sponge", "Towel", "Rain", "Mop"],
        1,
    ),
    (
        "I have cities, but no houses. I have mountains, but no trees. I have water, but no fish. What am I?",
        ["Planet", "Map", "Desert", "Painting"],
        1,
    ),
    (
        "What can you hold in your right hand but never in your left hand?",
        ["Your heart", "Your left hand", "Your shadow", "Your phone"],
        1,
    ),
    (
        "What goes up but never comes down?",
        ["Balloon", "Age", "Temperature", "Airplane"],
        1,
    ),
];

const QUOTES: &[(&str, [&str; 4], usize)] = &[
    (
        "Be the change you wish to see in the world.",
        ["Mahatma Gandhi", "Martin Luther King Jr.", "Nelson Mandela", "Mother Teresa"],
        0,
    ),
    (
        "The only thing we have to fear is fear itself.",
        ["Franklin D. Roosevelt", "Winston Churchill", "John F. Kennedy", "Abraham Lincoln"],
        0,
    ),
    (
        "I have a dream that one day this nation will rise up.",
        ["Martin Luther King Jr.", "Malcolm X", "Rosa Parks", "Barack Obama"],
        0,
    ),
    (
        "In the end, we will remember not the words of our enemies, but the silence of our friends.",
        ["Martin Luther King Jr.", "Nelson Mandela", "Mahatma Gandhi", "Desmond Tutu"],
        0,
    ),
    (
        "The future belongs to those who believe in the beauty of their dreams.",
        ["Eleanor Roosevelt", "Marie Curie", "Maya Angelou", "Rosa Parks"],
        0,
    ),
    (
        "Float like a butterfly, sting like a bee.",
        ["Muhammad Ali", "Mike Tyson", "Bruce Lee", "Michael Jordan"],
        0,
    ),
    (
        "Education is the most powerful weapon which you can use to change the world.",
        ["Nelson Mandela", "Martin Luther King Jr.", "Mahatma Gandhi", "Barack Obama"],
        0,
    ),
    (
        "Stay hungry, stay foolish.",
        ["Steve Jobs", "Bill Gates", "Mark Zuckerberg", "Elon Musk"],
        0,
    ),
    (
        "The only impossible journey is the one you never begin.",
        ["Tony Robbins", "Oprah Winfrey", "Steve Jobs", "Richard Branson"],
        0,
    ),
    (
        "Life is what happens when you're busy making other plans.",
        ["John Lennon", "Paul McCartney", "Bob Dylan", "Elvis Presley"],
        0,
    ),
];

const TRUTHS: &[&str] = &[
    "What's the most embarrassing thing you've done in college?",
    "Who was your first crush?",
    "What's the biggest lie you've ever told?",
    "What's your most embarrassing moment in a class?",
    "Have you ever cheated on a test?",
    "What's the weirdest dream you've ever had?",
    "Who in this group would you trust with your biggest secret?",
    "What's something you've done that you're not proud of?",
    "Have you ever had a crush on a teacher or professor?",
    "What's the most childish thing you still do?",
    "What's your biggest fear?",
    "Have you ever stalked someone on social media?",
    "What's the worst gift you've ever received?",
    "What's something you've never told your parents?",
    "Who's the last person you stalked on Instagram?",
];

const DARES: &[&str] = &[
    "Do your best impression of a professor teaching!",
    "Sing the national anthem in a funny voice!",
    "Do 20 push-ups right now!",
    "Dance without music for 1 minute!",
    "Text your crush 'Hey, what's up?'",
    "Post an embarrassing selfie on social media!",
    "Speak in an accent for the next 10 minutes!",
    "Let someone go through your phone for 1 minute!",
    "Do a handstand or try to for 30 seconds!",
    "Eat a spoonful of a condiment of the group's choice!",
    "Call a random contact and sing 'Happy Birthday' to them!",
    "Do your best celebrity impression!",
    "Wear your clothes backward for the next hour!",
    "Let the group give you a new hairstyle!",
    "Do the chicken dance!",
    "Speak only in rhymes for the next 5 minutes!",
    "Do 10 cartwheels in a row!",
    "Try to lick your elbow for 30 seconds!",
];

const WORDS: &[(&str, &str)] = &[
    ("COMPUTER", "Electronic device"),
    ("JAVASCRIPT", "Programming language"),
    ("COLLEGE", "Educational institution"),
    ("ALGORITHM", "Step-by-step procedure"),
    ("DATABASE", "Collection of data"),
    ("NETWORK", "Connected systems"),
    ("FUNCTION", "Block of code"),
    ("VARIABLE", "Data container"),
    ("KEYBOARD", "Input device"),
    ("BROWSER", "Internet application"),
];

const CLUES: &[(&str, &str, &str)] = &[
    (
        "Where knowledge begins each day, with chairs in rows and words that stay. Students gather to learn and grow, this place of wisdom you surely know.",
        "CLASSROOM",
        "It has desks and a blackboard",
    ),
    (
        "Rows of books from floor to ceiling, a quiet place for thoughtful reading. Whispers echo, students study here, knowledge awaits, crystal clear.",
        "LIBRARY",
        "Shhh! No talking allowed here",
    ),
    (
        "Where hunger meets its happy end, with trays and tables, many a friend. The smell of food fills the air, students gather without a care.",
        "CAFETERIA",
        "You eat lunch here",
    ),
    (
        "Green grass where games are played, running, jumping in the shade. Laughter echoes, students cheer, physical fun happens here.",
        "PLAYGROUND",
        "Where you play sports",
    ),
    (
        "Test tubes, beakers, chemicals galore, experiments happen behind this door. Safety goggles are a must, in this place of scientific trust.",
        "LABORATORY",
        "Science experiments happen here",
    ),
    (
        "The heart of campus, open and wide, where students meet from every side. Events and gatherings, day and night, in this central space so bright.",
        "AUDITORIUM",
        "Large hall for events",
    ),
];

pub fn title(game: GameId) -> &'static str {
    match game {
        GameId::RiddleRush => "Riddle Rush",
        GameId::WhoSaidIt => "Who Said It",
        GameId::TruthDare => "Truth or Dare",
        GameId::WordScramble => "Word Scramble",
        GameId::TreasureHunt => "Treasure Hunt",
    }
}

fn tiers(entries: &[(u32, &str)]) -> Vec<Tier> {
    entries
        .iter()
        .map(|(min_percent, title)| Tier {
            min_percent: *min_percent,
            title: title.to_string(),
        })
        .collect()
}

fn multiple_choice(source: &[(&str, [&str; 4], usize)]) -> Vec<Challenge> {
    source
        .iter()
        .map(|(prompt, options, correct)| Challenge::MultipleChoice {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: *correct,
        })
        .collect()
}

/// Shuffle the letters of `word` and space them out ("C O L L E G E").
///
/// Retries a few times so the puzzle rarely shows the answer verbatim.
pub fn scramble<R: Rng + ?Sized>(word: &str, rng: &mut R) -> String {
    let mut letters: Vec<char> = word.chars().collect();
    for _ in 0..5 {
        letters.shuffle(rng);
        if letters.iter().collect::<String>() != word {
            break;
        }
    }
    letters
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a fresh definition for one play of `game`.
pub fn definition(game: GameId) -> GameDefinition {
    definition_with_rng(game, &mut rand::rng())
}

pub fn definition_with_rng<R: Rng + ?Sized>(game: GameId, rng: &mut R) -> GameDefinition {
    let title = title(game).to_string();
    match game {
        GameId::RiddleRush => GameDefinition {
            game,
            title,
            items: multiple_choice(RIDDLES),
            scoring: ScoringRule {
                per_correct: 10,
                per_incorrect: 2,
                time_bonus_step: Some(10),
                completion_bonus: 0,
            },
            completion_threshold: None,
            item_timer: Some(Duration::from_secs(60)),
            allow_skip: true,
            tiers: tiers(&[
                (80, "Outstanding!"),
                (60, "Great Job!"),
                (40, "Good Effort!"),
                (0, "Try Again!"),
            ]),
        },
        GameId::WhoSaidIt => GameDefinition {
            game,
            title,
            items: multiple_choice(QUOTES),
            scoring: ScoringRule {
                per_correct: 10,
                per_incorrect: 0,
                time_bonus_step: None,
                completion_bonus: 0,
            },
            completion_threshold: None,
            item_timer: None,
            allow_skip: false,
            tiers: tiers(&[
                (80, "Quote Master!"),
                (60, "Well Done!"),
                (40, "Good Try!"),
                (0, "Keep Practicing!"),
            ]),
        },
        GameId::TruthDare => GameDefinition {
            game,
            title,
            items: (0..CHALLENGES_REQUIRED)
                .map(|_| Challenge::TruthOrDare {
                    truth: TRUTHS.choose(rng).copied().unwrap_or_default().to_string(),
                    dare: DARES.choose(rng).copied().unwrap_or_default().to_string(),
                })
                .collect(),
            scoring: ScoringRule {
                per_correct: 0,
                per_incorrect: 0,
                time_bonus_step: None,
                completion_bonus: 100,
            },
            completion_threshold: Some(CHALLENGES_REQUIRED),
            item_timer: None,
            allow_skip: false,
            tiers: tiers(&[(0, "Challenge Champion!")]),
        },
        GameId::WordScramble => GameDefinition {
            game,
            title,
            items: WORDS
                .iter()
                .map(|(word, hint)| Challenge::Typed {
                    prompt: scramble(word, rng),
                    hint: Some(hint.to_string()),
                    answer: word.to_string(),
                })
                .collect(),
            scoring: ScoringRule {
                per_correct: 10,
                per_incorrect: 0,
                time_bonus_step: None,
                completion_bonus: 0,
            },
            completion_threshold: None,
            item_timer: Some(Duration::from_secs(60)),
            allow_skip: true,
            tiers: tiers(&[(80, "Word Master!"), (60, "Great Job!"), (0, "Good Try!")]),
        },
        GameId::TreasureHunt => GameDefinition {
            game,
            title,
            items: CLUES
                .iter()
                .map(|(clue, answer, hint)| Challenge::Typed {
                    prompt: clue.to_string(),
                    hint: Some(hint.to_string()),
                    answer: answer.to_string(),
                })
                .collect(),
            scoring: ScoringRule {
                per_correct: 20,
                per_incorrect: 0,
                time_bonus_step: None,
                completion_bonus: 0,
            },
            completion_threshold: None,
            item_timer: None,
            allow_skip: false,
            tiers: tiers(&[
                (80, "Master Explorer!"),
                (60, "Great Job!"),
                (40, "Good Effort!"),
                (0, "Keep Exploring!"),
            ]),
        },
    }
}
