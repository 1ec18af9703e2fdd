use std::collections::HashMap;
use std::sync::OnceLock;

/// Opcode to scratchblocks template. `{NAME}` is filled from the block's
/// input or field of the same name.
pub const OPCODE_TEMPLATES: &[(&str, &str)] = &[
    // Motion
    ("motion_movesteps", "move {STEPS} steps"),
    ("motion_turnright", "turn cw {DEGREES} degrees"),
    ("motion_turnleft", "turn ccw {DEGREES} degrees"),
    ("motion_goto", "go to {TO}"),
    ("motion_gotoxy", "go to x: {X} y: {Y}"),
    ("motion_glideto", "glide {SECS} secs to {TO}"),
    ("motion_glidesecstoxy", "glide {SECS} secs to x: {X} y: {Y}"),
    ("motion_pointindirection", "point in direction {DIRECTION}"),
    ("motion_pointtowards", "point towards {TOWARDS}"),
    ("motion_changexby", "change x by {DX}"),
    ("motion_setx", "set x to {X}"),
    ("motion_changeyby", "change y by {DY}"),
    ("motion_sety", "set y to {Y}"),
    ("motion_ifonedgebounce", "if on edge, bounce"),
    ("motion_setrotationstyle", "set rotation style {STYLE}"),
    ("motion_xposition", "(x position)"),
    ("motion_yposition", "(y position)"),
    ("motion_direction", "(direction)"),
    // Looks
    ("looks_sayforsecs", "say {MESSAGE} for {SECS} seconds"),
    ("looks_say", "say {MESSAGE}"),
    ("looks_thinkforsecs", "think {MESSAGE} for {SECS} seconds"),
    ("looks_think", "think {MESSAGE}"),
    ("looks_switchcostumeto", "switch costume to {COSTUME}"),
    ("looks_nextcostume", "next costume"),
    ("looks_switchbackdropto", "switch backdrop to {BACKDROP}"),
    ("looks_switchbackdroptoandwait", "switch backdrop to {BACKDROP} and wait"),
    ("looks_nextbackdrop", "next backdrop"),
    ("looks_changesizeby", "change size by {CHANGE}"),
    ("looks_setsizeto", "set size to {SIZE}%"),
    ("looks_changeeffectby", "change {EFFECT} effect by {CHANGE}"),
    ("looks_seteffectto", "set {EFFECT} effect to {VALUE}"),
    ("looks_cleargraphiceffects", "clear graphic effects"),
    ("looks_show", "show"),
    ("looks_hide", "hide"),
    ("looks_gotofrontback", "go to {FRONT_BACK} layer"),
    ("looks_goforwardbackwardlayers", "go {FORWARD_BACKWARD} {NUM} layers"),
    ("looks_costumenumbername", "(costume {NUMBER_NAME})"),
    ("looks_backdropnumbername", "(backdrop {NUMBER_NAME})"),
    ("looks_size", "(size)"),
    // Sound
    ("sound_playuntildone", "play sound {SOUND_MENU} until done"),
    ("sound_play", "start sound {SOUND_MENU}"),
    ("sound_stopallsounds", "stop all sounds"),
    ("sound_changeeffectby", "change {EFFECT} effect by {VALUE} :: sound"),
    ("sound_seteffectto", "set {EFFECT} effect to {VALUE} :: sound"),
    ("sound_cleareffects", "clear sound effects"),
    ("sound_changevolumeby", "change volume by {VOLUME}"),
    ("sound_setvolumeto", "set volume to {VOLUME}%"),
    ("sound_volume", "(volume)"),
    // Events
    ("event_whenflagclicked", "when green flag clicked"),
    ("event_whenkeypressed", "when {KEY_OPTION} key pressed"),
    ("event_whenthisspriteclicked", "when this sprite clicked"),
    ("event_whenstageclicked", "when stage clicked"),
    ("event_whentouchingobject", "when this sprite touches {TOUCHINGOBJECTMENU}"),
    ("event_whenbackdropswitchesto", "when backdrop switches to {BACKDROP}"),
    ("event_whengreaterthan", "when {WHENGREATERTHANMENU} > {VALUE}"),
    ("event_whenbroadcastreceived", "when I receive {BROADCAST_OPTION}"),
    ("event_broadcast", "broadcast {BROADCAST_INPUT}"),
    ("event_broadcastandwait", "broadcast {BROADCAST_INPUT} and wait"),
    // Control
    ("control_wait", "wait {DURATION} seconds"),
    ("control_repeat", "repeat {TIMES}"),
    ("control_forever", "forever"),
    ("control_if", "if {CONDITION} then"),
    ("control_if_else", "if {CONDITION} then"),
    ("control_wait_until", "wait until {CONDITION}"),
    ("control_repeat_until", "repeat until {CONDITION}"),
    ("control_stop", "stop {STOP_OPTION}"),
    ("control_start_as_clone", "when I start as a clone"),
    ("control_create_clone_of", "create clone of {CLONE_OPTION}"),
    ("control_delete_this_clone", "delete this clone"),
    // Sensing
    ("sensing_touchingobject", "<touching {TOUCHINGOBJECTMENU}?>"),
    ("sensing_touchingcolor", "<touching color {COLOR}?>"),
    ("sensing_coloristouchingcolor", "<color {COLOR} is touching {COLOR2}?>"),
    ("sensing_distanceto", "(distance to {DISTANCETOMENU})"),
    ("sensing_askandwait", "ask {QUESTION} and wait"),
    ("sensing_answer", "(answer)"),
    ("sensing_keypressed", "<key {KEY_OPTION} pressed?>"),
    ("sensing_mousedown", "<mouse down?>"),
    ("sensing_mousex", "(mouse x)"),
    ("sensing_mousey", "(mouse y)"),
    ("sensing_setdragmode", "set drag mode {DRAG_MODE}"),
    ("sensing_loudness", "(loudness)"),
    ("sensing_timer", "(timer)"),
    ("sensing_resettimer", "reset timer"),
    ("sensing_of", "({PROPERTY} of {OBJECT})"),
    ("sensing_current", "(current {CURRENTMENU})"),
    ("sensing_dayssince2000", "(days since 2000)"),
    ("sensing_username", "(username)"),
    // Operators
    ("operator_add", "({NUM1} + {NUM2})"),
    ("operator_subtract", "({NUM1} - {NUM2})"),
    ("operator_multiply", "({NUM1} * {NUM2})"),
    ("operator_divide", "({NUM1} / {NUM2})"),
    ("operator_random", "(pick random {FROM} to {TO})"),
    ("operator_gt", "<{OPERAND1} > {OPERAND2}>"),
    ("operator_lt", "<{OPERAND1} < {OPERAND2}>"),
    ("operator_equals", "<{OPERAND1} = {OPERAND2}>"),
    ("operator_and", "<{OPERAND1} and {OPERAND2}>"),
    ("operator_or", "<{OPERAND1} or {OPERAND2}>"),
    ("operator_not", "<not {OPERAND}>"),
    ("operator_join", "(join {STRING1} {STRING2})"),
    ("operator_letter_of", "(letter {LETTER} of {STRING})"),
    ("operator_length", "(length of {STRING})"),
    ("operator_contains", "<{STRING1} contains {STRING2}?>"),
    ("operator_mod", "({NUM1} mod {NUM2})"),
    ("operator_round", "(round {NUM})"),
    ("operator_mathop", "({OPERATOR} of {NUM} :: operators)"),
    // Variables
    ("data_variable", "({VARIABLE})"),
    ("data_setvariableto", "set {VARIABLE} to {VALUE}"),
    ("data_changevariableby", "change {VARIABLE} by {VALUE}"),
    ("data_showvariable", "show variable {VARIABLE}"),
    ("data_hidevariable", "hide variable {VARIABLE}"),
    // Lists
    ("data_listcontents", "({LIST} :: list)"),
    ("data_addtolist", "add {ITEM} to {LIST}"),
    ("data_deleteoflist", "delete {INDEX} of {LIST}"),
    ("data_deletealloflist", "delete all of {LIST}"),
    ("data_insertatlist", "insert {ITEM} at {INDEX} of {LIST}"),
    ("data_replaceitemoflist", "replace item {INDEX} of {LIST} with {ITEM}"),
    ("data_itemoflist", "(item {INDEX} of {LIST})"),
    ("data_itemnumoflist", "(item # of {ITEM} in {LIST})"),
    ("data_lengthoflist", "(length of {LIST})"),
    ("data_listcontainsitem", "<{LIST} contains {ITEM}?>"),
    ("data_showlist", "show list {LIST}"),
    ("data_hidelist", "hide list {LIST}"),
    // My Blocks. Definitions and calls are rendered from their mutation.
    ("procedures_definition", "define {PROCCODE}"),
    ("procedures_call", "{PROCCODE}"),
    ("argument_reporter_string_number", "({VALUE})"),
    ("argument_reporter_boolean", "<{VALUE}>"),
    // Menus carry a dropdown value to their parent.
    ("sensing_touchingobjectmenu", "{TOUCHINGOBJECTMENU}"),
    ("event_touchingobjectmenu", "{TOUCHINGOBJECTMENU}"),
    ("motion_pointtowards_menu", "{TOWARDS}"),
    ("motion_goto_menu", "{TO}"),
    ("motion_glideto_menu", "{TO}"),
    ("looks_costume", "{COSTUME}"),
    ("looks_backdrops", "{BACKDROP}"),
    ("sound_sounds_menu", "{SOUND_MENU}"),
    ("event_broadcast_menu", "{BROADCAST_OPTION}"),
    ("control_create_clone_of_menu", "{CLONE_OPTION}"),
    ("sensing_of_object_menu", "{OBJECT}"),
    ("sensing_distancetomenu", "{DISTANCETOMENU}"),
    ("sensing_keyoptions", "{KEY_OPTION}"),
    // Music
    ("music_playDrumForBeats", "play drum {DRUM} for {BEATS} beats"),
    ("music_restForBeats", "rest for {BEATS} beats"),
    ("music_playNoteForBeats", "play note {NOTE} for {BEATS} beats"),
    ("music_setInstrument", "set instrument to {INSTRUMENT}"),
    ("music_setTempo", "set tempo to {TEMPO}"),
    ("music_changeTempo", "change tempo by {TEMPO}"),
    ("music_getTempo", "(tempo)"),
    ("music_menu_DRUM", "{DRUM}"),
    ("music_menu_INSTRUMENT", "{INSTRUMENT}"),
    ("note", "[{NOTE}]"),
    // Pen
    ("pen_clear", "erase all"),
    ("pen_stamp", "stamp"),
    ("pen_penDown", "pen down"),
    ("pen_penUp", "pen up"),
    ("pen_setPenColorToColor", "set pen color to {COLOR}"),
    ("pen_changePenColorParamBy", "change pen {COLOR_PARAM} by {VALUE}"),
    ("pen_setPenColorParamTo", "set pen {COLOR_PARAM} to {VALUE}"),
    ("pen_changePenSizeBy", "change pen size by {SIZE}"),
    ("pen_setPenSizeTo", "set pen size to {SIZE}"),
    ("pen_menu_colorParam", "{colorParam}"),
    // Video Sensing
    ("videoSensing_whenMotionGreaterThan", "when video motion > {REFERENCE}"),
    ("videoSensing_videoOn", "(video {ATTRIBUTE} on {SUBJECT})"),
    ("videoSensing_videoToggle", "turn video {VIDEO_STATE}"),
    ("videoSensing_setVideoTransparency", "set video transparency to {TRANSPARENCY}%"),
    ("videoSensing_menu_ATTRIBUTE", "{ATTRIBUTE}"),
    ("videoSensing_menu_SUBJECT", "{SUBJECT}"),
    ("videoSensing_menu_VIDEO_STATE", "{VIDEO_STATE}"),
    // Face Sensing
    ("faceSensing_whenFaceDetected", "when face is detected::#00aa00"),
    ("faceSensing_whenTilted", "when head tilted {DIRECTION}::#00aa00"),
    ("faceSensing_whenSpriteTouchesPart", "when this sprite touches {PART}::#00aa00"),
    ("faceSensing_goToPart", "go to {PART}::#00aa00"),
    ("faceSensing_pointInFaceTiltDirection", "point in face tilt direction::#00aa00"),
    ("faceSensing_setSizeToFaceSize", "set size to face size::#00aa00"),
    ("faceSensing_faceIsDetected", "<face is detected?::#00aa00>"),
    ("faceSensing_faceTilt", "(face tilt::#00aa00)"),
    ("faceSensing_faceSize", "(face size::#00aa00)"),
    // Text to Speech
    ("text2speech_speakAndWait", "speak {WORDS}"),
    ("text2speech_setVoice", "set voice to {VOICE}"),
    ("text2speech_setLanguage", "set language to {LANGUAGE}"),
    ("text2speech_menu_voices", "{voices}"),
    ("text2speech_menu_languages", "{languages}"),
    // Translate
    ("translate_getTranslate", "(translate {WORDS} to {LANGUAGE})"),
    ("translate_getViewerLanguage", "(language)"),
    ("translate_menu_languages", "{languages}"),
];

const BOOLEAN_OPCODES: &[&str] = &[
    "sensing_touchingobject",
    "sensing_touchingcolor",
    "sensing_coloristouchingcolor",
    "sensing_keypressed",
    "sensing_mousedown",
    "operator_gt",
    "operator_lt",
    "operator_equals",
    "operator_and",
    "operator_or",
    "operator_not",
    "operator_contains",
    "data_listcontainsitem",
    "argument_reporter_boolean",
    "faceSensing_faceIsDetected",
];

const MENU_OPCODES: &[&str] = &[
    "sensing_touchingobjectmenu",
    "event_touchingobjectmenu",
    "motion_pointtowards_menu",
    "motion_goto_menu",
    "motion_glideto_menu",
    "looks_costume",
    "looks_backdrops",
    "sound_sounds_menu",
    "event_broadcast_menu",
    "control_create_clone_of_menu",
    "sensing_of_object_menu",
    "sensing_distancetomenu",
    "sensing_keyoptions",
    "music_menu_DRUM",
    "music_menu_INSTRUMENT",
    "note",
    "pen_menu_colorParam",
    "videoSensing_menu_ATTRIBUTE",
    "videoSensing_menu_SUBJECT",
    "videoSensing_menu_VIDEO_STATE",
    "text2speech_menu_voices",
    "text2speech_menu_languages",
    "translate_menu_languages",
];

const C_BLOCK_OPCODES: &[&str] = &[
    "control_repeat",
    "control_forever",
    "control_if",
    "control_if_else",
    "control_repeat_until",
];

const NAME_REPORTER_OPCODES: &[&str] = &["data_variable", "data_listcontents"];

const SUBSTACK_INPUTS: &[&str] = &["SUBSTACK", "SUBSTACK2"];

const DROPDOWN_FIELDS: &[&str] = &[
    "TO",
    "TOWARDS",
    "STYLE",
    "COSTUME",
    "BACKDROP",
    "EFFECT",
    "FRONT_BACK",
    "FORWARD_BACKWARD",
    "NUMBER_NAME",
    "SOUND_MENU",
    "KEY_OPTION",
    "WHENGREATERTHANMENU",
    "BROADCAST_OPTION",
    "BROADCAST_INPUT",
    "STOP_OPTION",
    "CLONE_OPTION",
    "TOUCHINGOBJECTMENU",
    "DISTANCETOMENU",
    "DRAG_MODE",
    "PROPERTY",
    "OBJECT",
    "CURRENTMENU",
    "OPERATOR",
    "VARIABLE",
    "LIST",
    "DRUM",
    "INSTRUMENT",
    "ATTRIBUTE",
    "SUBJECT",
    "VIDEO_STATE",
    "PART",
    "DIRECTION",
    "VOICE",
    "LANGUAGE",
    "voices",
    "languages",
    "colorParam",
];

/// Menu constants stored upper-case but displayed lower-case.
const LOWERCASE_CONSTANTS: &[&str] = &[
    "BRIGHTNESS", "COLOR", "DATE", "DAYOFWEEK", "FISHEYE", "GHOST", "HOUR", "LOUDNESS", "MINUTE",
    "MONTH", "MOSAIC", "PAN", "PITCH", "PIXELATE", "SECOND", "TIMER", "WHIRL", "YEAR",
];

const DRUM_NAMES: &[(&str, &str)] = &[
    ("1", "Snare Drum (1)"),
    ("2", "Bass Drum (2)"),
    ("3", "Side Stick (3)"),
    ("4", "Crash Cymbal (4)"),
    ("5", "Open Hi-Hat (5)"),
    ("6", "Closed Hi-Hat (6)"),
    ("7", "Tambourine (7)"),
    ("8", "Hand Clap (8)"),
    ("9", "Claves (9)"),
    ("10", "Wood Block (10)"),
    ("11", "Cowbell (11)"),
    ("12", "Triangle (12)"),
    ("13", "Bongo (13)"),
    ("14", "Conga (14)"),
    ("15", "Cabasa (15)"),
    ("16", "Guiro (16)"),
    ("17", "Vibraslap (17)"),
    ("18", "Cuica (18)"),
];

const INSTRUMENT_NAMES: &[(&str, &str)] = &[
    ("1", "Piano (1)"),
    ("2", "Electric Piano (2)"),
    ("3", "Organ (3)"),
    ("4", "Guitar (4)"),
    ("5", "Electric Guitar (5)"),
    ("6", "Bass (6)"),
    ("7", "Pizzicato (7)"),
    ("8", "Cello (8)"),
    ("9", "Trombone (9)"),
    ("10", "Clarinet (10)"),
    ("11", "Saxophone (11)"),
    ("12", "Flute (12)"),
    ("13", "Wooden Flute (13)"),
    ("14", "Bassoon (14)"),
    ("15", "Choir (15)"),
    ("16", "Vibraphone (16)"),
    ("17", "Music Box (17)"),
    ("18", "Steel Drum (18)"),
    ("19", "Marimba (19)"),
    ("20", "Synth Lead (20)"),
    ("21", "Synth Pad (21)"),
];

const PEN_COLOR_PARAMS: &[(&str, &str)] = &[
    ("color", "color"),
    ("saturation", "saturation"),
    ("brightness", "brightness"),
    ("transparency", "transparency"),
];

const FACE_PARTS: &[(&str, &str)] = &[
    ("0", "nose (0)"),
    ("1", "eyes (1)"),
    ("2", "mouth (2)"),
    ("3", "left eye (3)"),
    ("4", "right eye (4)"),
    ("5", "left ear (5)"),
    ("6", "right ear (6)"),
    ("7", "chin (7)"),
];

const FACE_DIRECTIONS: &[(&str, &str)] = &[("left", "left"), ("right", "right")];

const TEXT2SPEECH_VOICES: &[(&str, &str)] = &[
    ("ALTO", "alto"),
    ("TENOR", "tenor"),
    ("SQUEAK", "squeak"),
    ("GIANT", "giant"),
    ("KITTEN", "kitten"),
];

const TEXT2SPEECH_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("zh-cn", "Chinese (Mandarin)"),
    ("pt-br", "Portuguese (Brazilian)"),
    ("ja", "Japanese"),
    ("de", "German"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("pt", "Portuguese (European)"),
    ("ru", "Russian"),
    ("tr", "Turkish"),
    ("ar", "Arabic"),
    ("is", "Icelandic"),
    ("nb", "Norwegian"),
    ("ro", "Romanian"),
    ("sv", "Swedish"),
    ("cy", "Welsh"),
];

pub fn template(opcode: &str) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE
        .get_or_init(|| OPCODE_TEMPLATES.iter().copied().collect())
        .get(opcode)
        .copied()
}

pub fn is_boolean_opcode(opcode: &str) -> bool {
    BOOLEAN_OPCODES.contains(&opcode)
}

pub fn is_menu_opcode(opcode: &str) -> bool {
    MENU_OPCODES.contains(&opcode)
}

pub fn is_c_block(opcode: &str) -> bool {
    C_BLOCK_OPCODES.contains(&opcode)
}

pub fn is_name_reporter(opcode: &str) -> bool {
    NAME_REPORTER_OPCODES.contains(&opcode)
}

pub fn is_substack_input(name: &str) -> bool {
    SUBSTACK_INPUTS.contains(&name)
}

pub fn is_dropdown_field(field_name: &str) -> bool {
    DROPDOWN_FIELDS.contains(&field_name)
}

pub fn is_lowercase_constant(value: &str) -> bool {
    LOWERCASE_CONSTANTS.contains(&value)
}

pub fn field_label(field_name: &str, value: &str) -> Option<&'static str> {
    let table = match field_name {
        "DRUM" => DRUM_NAMES,
        "INSTRUMENT" => INSTRUMENT_NAMES,
        "colorParam" => PEN_COLOR_PARAMS,
        "PART" => FACE_PARTS,
        "DIRECTION" => FACE_DIRECTIONS,
        "voices" => TEXT2SPEECH_VOICES,
        "languages" => TEXT2SPEECH_LANGUAGES,
        _ => return None,
    };
    lookup(table, value)
}

pub fn pen_color_param_label(value: &str) -> Option<&'static str> {
    lookup(PEN_COLOR_PARAMS, value)
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, label)| *label)
}
