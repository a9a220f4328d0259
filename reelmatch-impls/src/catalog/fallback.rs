use reelmatch_core::{GenreId, Movie, MovieId};

const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

struct Bundled {
    id: &'static str,
    title: &'static str,
    year: u16,
    genre_ids: &'static [GenreId],
    rating: f32,
    description: &'static str,
    poster_path: &'static str,
    director: &'static str,
    cast: [&'static str; 3],
    runtime: u32,
}

const BUNDLED: [Bundled; 12] = [
    Bundled {
        id: "155",
        title: "The Dark Knight",
        year: 2008,
        genre_ids: &[28, 80, 18],
        rating: 9.0,
        description: "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests of his ability to fight injustice.",
        poster_path: "/qJ2tW6WMUDux911r6m7haRef0WH.jpg",
        director: "Christopher Nolan",
        cast: ["Christian Bale", "Heath Ledger", "Aaron Eckhart"],
        runtime: 152,
    },
    Bundled {
        id: "27205",
        title: "Inception",
        year: 2010,
        genre_ids: &[28, 878, 53],
        rating: 8.8,
        description: "A thief who steals corporate secrets through the use of dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
        poster_path: "/9gk7adHYeDvHkCSEqAvQNLV5Uge.jpg",
        director: "Christopher Nolan",
        cast: ["Leonardo DiCaprio", "Marion Cotillard", "Tom Hardy"],
        runtime: 148,
    },
    Bundled {
        id: "278",
        title: "The Shawshank Redemption",
        year: 1994,
        genre_ids: &[18],
        rating: 9.3,
        description: "Two imprisoned men bond over a number of years, finding solace and eventual redemption through acts of common decency.",
        poster_path: "/q6y0Go1tsGEsmtFryDOJo3dEmqu.jpg",
        director: "Frank Darabont",
        cast: ["Tim Robbins", "Morgan Freeman", "Bob Gunton"],
        runtime: 142,
    },
    Bundled {
        id: "680",
        title: "Pulp Fiction",
        year: 1994,
        genre_ids: &[80, 18],
        rating: 8.9,
        description: "The lives of two mob hitmen, a boxer, a gangster and his wife, and a pair of diner bandits intertwine in four tales of violence and redemption.",
        poster_path: "/d5iIlFn5s0ImszYzBPb8JPIfbXD.jpg",
        director: "Quentin Tarantino",
        cast: ["John Travolta", "Samuel L. Jackson", "Uma Thurman"],
        runtime: 154,
    },
    Bundled {
        id: "122",
        title: "The Lord of the Rings: The Return of the King",
        year: 2003,
        genre_ids: &[12, 18, 14],
        rating: 8.9,
        description: "Gandalf and Aragorn lead the World of Men against Sauron's army to draw his gaze from Frodo and Sam as they approach Mount Doom with the One Ring.",
        poster_path: "/rCzpDGLbOoPwLjy3OAm5NUPOTrC.jpg",
        director: "Peter Jackson",
        cast: ["Elijah Wood", "Viggo Mortensen", "Ian McKellen"],
        runtime: 201,
    },
    Bundled {
        id: "13",
        title: "Forrest Gump",
        year: 1994,
        genre_ids: &[18, 10749],
        rating: 8.8,
        description: "The presidencies of Kennedy and Johnson, the events of Vietnam, Watergate and other historical events unfold from the perspective of an Alabama man with an IQ of 75.",
        poster_path: "/arw2vcBveWOVZr6pxd9XTd1TdQa.jpg",
        director: "Robert Zemeckis",
        cast: ["Tom Hanks", "Robin Wright", "Gary Sinise"],
        runtime: 142,
    },
    Bundled {
        id: "603",
        title: "The Matrix",
        year: 1999,
        genre_ids: &[28, 878],
        rating: 8.7,
        description: "A computer hacker learns from mysterious rebels about the true nature of his reality and his role in the war against its controllers.",
        poster_path: "/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
        director: "Lana Wachowski",
        cast: ["Keanu Reeves", "Laurence Fishburne", "Carrie-Anne Moss"],
        runtime: 136,
    },
    Bundled {
        id: "769",
        title: "Goodfellas",
        year: 1990,
        genre_ids: &[80, 18],
        rating: 8.7,
        description: "The story of Henry Hill and his life in the mob, covering his relationship with his wife Karen Hill and his mob partners.",
        poster_path: "/aKuFiU82s5ISJpGZp7YkIr3kCUd.jpg",
        director: "Martin Scorsese",
        cast: ["Robert De Niro", "Ray Liotta", "Joe Pesci"],
        runtime: 146,
    },
    Bundled {
        id: "238",
        title: "The Godfather",
        year: 1972,
        genre_ids: &[80, 18],
        rating: 9.2,
        description: "An organized crime dynasty's aging patriarch transfers control of his clandestine empire to his reluctant son.",
        poster_path: "/3bhkrj58Vtu7enYsRolD1fZdja1.jpg",
        director: "Francis Ford Coppola",
        cast: ["Marlon Brando", "Al Pacino", "James Caan"],
        runtime: 175,
    },
    Bundled {
        id: "157336",
        title: "Interstellar",
        year: 2014,
        genre_ids: &[12, 18, 878],
        rating: 8.6,
        description: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        poster_path: "/gEU2QniE6E77NI6lCU6MxlNBvIx.jpg",
        director: "Christopher Nolan",
        cast: ["Matthew McConaughey", "Anne Hathaway", "Jessica Chastain"],
        runtime: 169,
    },
    Bundled {
        id: "496243",
        title: "Parasite",
        year: 2019,
        genre_ids: &[35, 18, 53],
        rating: 8.6,
        description: "Greed and class discrimination threaten the newly formed symbiotic relationship between the wealthy Park family and the destitute Kim clan.",
        poster_path: "/7IiTTgloJzvGI1TAYymCfbfl3vT.jpg",
        director: "Bong Joon Ho",
        cast: ["Kang-ho Song", "Sun-kyun Lee", "Yeo-jeong Jo"],
        runtime: 132,
    },
    Bundled {
        id: "24428",
        title: "The Avengers",
        year: 2012,
        genre_ids: &[28, 12, 878],
        rating: 8.0,
        description: "Earth's mightiest heroes must come together and learn to fight as a team if they are going to stop the mischievous Loki and his alien army from enslaving humanity.",
        poster_path: "/RYMX2wcKCBAr24UyPD7xwmjaTn.jpg",
        director: "Joss Whedon",
        cast: ["Robert Downey Jr.", "Chris Evans", "Mark Ruffalo"],
        runtime: 143,
    },
];

/// A small catalog shipped with the client, so a room never ends up without movies.
pub fn fallback_catalog() -> Vec<Movie> {
    BUNDLED.iter().map(Bundled::to_movie).collect()
}

impl Bundled {
    fn to_movie(&self) -> Movie {
        Movie {
            id: MovieId::from(self.id),
            title: self.title.to_string(),
            year: self.year,
            genre_ids: self.genre_ids.to_vec(),
            rating: self.rating,
            description: self.description.to_string(),
            poster: format!("{}{}", POSTER_BASE, self.poster_path),
            director: self.director.to_string(),
            cast: self.cast.iter().map(|c| c.to_string()).collect(),
            runtime: self.runtime,
        }
    }
}
