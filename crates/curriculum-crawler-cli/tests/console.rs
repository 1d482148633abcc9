//! Console commands over a dataset that went through the data file.

use std::rc::Rc;

use curriculum_crawler::{storage, CurriculumDataset, Durations, Institution, Program};
use curriculum_crawler_cli::repl::{Console, Flow};
use curriculum_crawler_cli::resolve_data_path;

fn crawled() -> CurriculumDataset {
    let mut ds = CurriculumDataset::new();
    ds.institutions.push(Institution::new("Instituto de Matemática e Estatística ( IME )"));
    ds.institutions.push(Institution::new("Instituto de Física ( IF )"));

    let calc = ds.disciplines.get_or_create("MAT0111", "Cálculo Diferencial e Integral I");
    let mac = ds.disciplines.get_or_create("MAC0110", "Introdução à Computação");
    let fis = ds.disciplines.get_or_create("4302111", "Física I");

    let mut bcc = Program::new("Ciência da Computação", "Instituto de Matemática e Estatística ( IME )");
    bcc.durations = Durations { ideal: 8, min: 8, max: 12 };
    bcc.mandatory = vec![Rc::clone(&mac), Rc::clone(&calc)];
    bcc.free_elective = vec![Rc::clone(&fis)];
    ds.add_program(0, bcc);

    let mut fisica = Program::new("Física - Bacharelado", "Instituto de Física ( IF )");
    fisica.durations = Durations { ideal: 10, min: 8, max: 14 };
    fisica.mandatory = vec![Rc::clone(&fis), Rc::clone(&calc)];
    ds.add_program(1, fisica);

    ds
}

fn round_trip(dataset: &CurriculumDataset) -> CurriculumDataset {
    let dir = tempfile::tempdir().unwrap();
    let path = resolve_data_path(Some(dir.path().join("cache/curriculum_data.json").to_str().unwrap()));
    storage::save(dataset, &path).unwrap();
    storage::load(&path).unwrap()
}

fn exec(console: &Console<'_>, line: &str) -> String {
    let mut out = String::new();
    assert_eq!(console.execute(line, &mut out), Flow::Continue);
    out
}

#[test]
fn test_console_over_reloaded_dataset() {
    let ds = round_trip(&crawled());
    let console = Console::new(&ds);

    let units = exec(&console, "/units");
    let fisica = units.find("Instituto de Física").unwrap();
    let ime = units.find("Instituto de Matemática").unwrap();
    assert!(fisica < ime);

    let programs = exec(&console, "/programs");
    assert!(programs.contains("- Ciência da Computação"));
    assert!(programs.contains("- Física - Bacharelado"));

    let search = exec(&console, "/search FÍSICA");
    assert!(search.contains("Física - Bacharelado (Instituto de Física ( IF ))"));

    let curriculum = exec(&console, "/curriculum ime 1");
    assert!(curriculum.contains("MAC0110 - Introdução à Computação"));
    assert!(curriculum.contains("Optativas Livres"));
    assert!(curriculum.contains("4302111 - Física I"));
}

#[test]
fn test_shared_disciplines_survive_reload() {
    let ds = round_trip(&crawled());
    let console = Console::new(&ds);

    let common = exec(&console, "/common");
    assert!(common.contains("MAT0111 - Cálculo Diferencial e Integral I (used in 2 programs)"));
    assert!(common.contains("4302111 - Física I (used in 2 programs)"));
    assert!(!common.contains("MAC0110"));

    let stats = exec(&console, "/stats");
    assert!(stats.contains("Avg ideal duration:  9.0 terms"));
    assert!(stats.contains("Most mandatory:"));
}
