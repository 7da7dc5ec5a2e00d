use lazy_static::lazy_static;
use std::collections::HashSet;

// Prepositions, conjunctions, particles and interjections. Entries are in
// normalized form: lowercase, letters only.
lazy_static! {
    pub static ref RUSSIAN_FUNCTION_WORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            // prepositions
            "без","безо","близ","в","вне","вместо","во","вокруг","возле","для","до","за","из","изза","изпод","изо",
            "к","ко","кроме","между","мимо","на","над","надо","о","об","обо","около","от","ото","перед","передо","по",
            "под","подо","после","при","про","ради","с","сквозь","среди","со","у","через","вдоль","сверх","против",
            // conjunctions
            "а","и","но","или","либо","да","зато","однако","что","чтобы","чтоб","как","если","когда","хотя","хоть",
            "потому","поэтому","также","тоже","ибо","пока","будто","словно","точно","раз","едва","причем","притом",
            "итак","то","ни",
            // particles
            "не","же","ж","бы","б","ли","ль","ведь","вот","вон","лишь","только","даже","уж","уже","ещё","еще","разве",
            "неужели","пусть","пускай","давай","ну","именно","вроде","почти","чуть","авось",
            // interjections
            "ах","ох","ой","эх","ух","ай","эй","увы","ага","ого",
        ];
        words.iter().copied().collect()
    };

    pub static ref ENGLISH_FUNCTION_WORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            // articles
            "a","an","the",
            // prepositions
            "about","above","across","after","against","along","amid","among","around","at","before","behind",
            "below","beneath","beside","besides","between","beyond","by","despite","down","during","except","for",
            "from","in","inside","into","near","of","off","on","onto","out","outside","over","past","per","since",
            "through","throughout","till","to","toward","towards","under","underneath","unlike","until","up","upon",
            "via","with","within","without",
            // conjunctions
            "and","but","or","nor","so","yet","although","because","though","unless","whereas","whether","while",
            "if","than","that","as","either","neither","once","lest","whilst",
            // particles
            "not",
            // interjections
            "oh","ah","hey","alas","wow",
        ];
        words.iter().copied().collect()
    };
}
